#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

fn main() {
    invoice_entry_lib::run()
}
