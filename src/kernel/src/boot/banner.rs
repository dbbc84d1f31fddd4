//! Boot banner.

use crate::arch::x86_64::vga::{self, Color};
use crate::kernel::{BUILD_DATE, BUILD_TIME};
use crate::println;

/// Print the ProbeOS banner.
pub fn print_banner() {
    vga::set_color(Color::Cyan, Color::Black);
    println!("  ____            _          ___  ____  ");
    println!(" |  _ \\ _ __ ___ | |__   ___ / _ \\/ ___| ");
    println!(" | |_) | '__/ _ \\| '_ \\ / _ \\ | | \\___ \\ ");
    println!(" |  __/| | | (_) | |_) |  __/ |_| |___) |");
    println!(" |_|   |_|  \\___/|_.__/ \\___|\\___/|____/ ");
    println!();
    vga::set_color(Color::White, Color::Black);
    println!(
        " ProbeOS v{} ({} {})",
        env!("CARGO_PKG_VERSION"),
        BUILD_DATE,
        BUILD_TIME
    );
    println!();
}
