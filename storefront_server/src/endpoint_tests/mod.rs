mod helpers;

mod admin;
mod checkout;
mod payments;
mod tracking;
