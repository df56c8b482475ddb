mod helpers;

mod editor_tests;
mod open_tests;
mod remove_tests;
