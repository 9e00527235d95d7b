//! Text command - run the text helpers from the shell

use crate::cli::args::{OutputFormat, TextAction, TextArgs};
use crate::error::QueryKitResult;
use crate::text;

/// Execute the text command
pub async fn execute(args: TextArgs) -> QueryKitResult<()> {
    match args.action {
        TextAction::Truncate { text, length } => println!("{}", text::truncate_text(&text, length)),
        TextAction::Emoji { text, format } => print_emoji(&text, format)?,
        TextAction::Clean { text } => println!("{}", text::remove_double_spaces(&text)),
        TextAction::Number { text } => println!("{}", text::validate_number(&text)),
        TextAction::Email { text } => println!("{}", text::validate_email(&text)),
    }

    Ok(())
}

fn print_emoji(input: &str, format: OutputFormat) -> QueryKitResult<()> {
    let only_emoji = text::validate_text_contains_only_emoji(input);
    let amount = text::get_emoji_amount(input);

    match format {
        OutputFormat::Json => {
            let report = serde_json::json!({
                "only_emoji": only_emoji,
                "amount": amount,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Plain => println!("{} {}", only_emoji, amount),
        OutputFormat::Table => {
            println!("{:<12} {}", "ONLY EMOJI", only_emoji);
            println!("{:<12} {}", "AMOUNT", amount);
        }
    }

    Ok(())
}
