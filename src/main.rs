use crate::cli::run;

mod catalog;
mod cli;
mod config;
mod domain;
mod http;
mod quiz;

fn main() {
    run();
}
