// Shared helpers for wakegated integration tests: user prompts for the
// microphone tests and synthetic PCM for the hardware-free ones.
#![allow(dead_code)]

use std::io::{self, Write};

/// Ask user to confirm an action
pub fn confirm_action(prompt: &str) -> bool {
    print!(
        "\n[CONFIRM] {}\nPress 'y' to confirm, any other key to skip: ",
        prompt
    );
    io::stdout().flush().unwrap();

    let mut input = String::new();
    io::stdin().read_line(&mut input).unwrap();

    input.trim().to_lowercase() == "y"
}

/// Print a section header
pub fn print_header(title: &str) {
    println!("\n{}", "=".repeat(60));
    println!("  {}", title);
    println!("{}", "=".repeat(60));
}

pub fn print_success(message: &str) {
    println!("\n✓ {}", message);
}

pub fn print_error(message: &str) {
    println!("\n✗ {}", message);
}

pub fn print_info(message: &str) {
    println!("\nℹ {}", message);
}

/// Square wave at `level`, so every sample has magnitude `level`.
pub fn square_wave(level: i16, len: usize) -> Vec<i16> {
    (0..len)
        .map(|i| if (i / 8) % 2 == 0 { level } else { -level })
        .collect()
}

/// `blocks` blocks of `block_size` samples, concatenated.
pub fn burst(level: i16, blocks: usize, block_size: usize) -> Vec<i16> {
    square_wave(level, blocks * block_size)
}
