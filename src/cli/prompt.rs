use anyhow::{Context, Result};
use dialoguer::{Confirm, Password, theme::ColorfulTheme};

pub fn password(supplied: Option<String>, confirm: bool) -> Result<String> {
    if let Some(value) = supplied {
        return Ok(value);
    }

    let theme = ColorfulTheme::default();
    let mut prompt = Password::with_theme(&theme);
    prompt = prompt.with_prompt("  Password");
    if confirm {
        prompt = prompt.with_confirmation("  Repeat password", "  Passwords do not match");
    }

    prompt.interact().context("Failed to read password")
}

pub fn confirm(question: &str) -> Result<bool> {
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("  {question}"))
        .default(false)
        .interact()
        .context("Failed to read confirmation input")
}
