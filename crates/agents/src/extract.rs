//! Shared text-extraction helpers for the agent pipelines. All parsing is
//! deterministic; a learned extractor can replace individual call sites as
//! long as the extracted shapes stay the same.

/// Scans for monetary amounts in JPY. Accepts comma-grouped digits
/// (`80,000,000`) and the 万 suffix (`8000万` = 80,000,000).
pub fn scan_amounts(text: &str) -> Vec<i64> {
    let mut amounts = Vec::new();
    let characters: Vec<char> = text.chars().collect();
    let mut index = 0;

    while index < characters.len() {
        if !characters[index].is_ascii_digit() {
            index += 1;
            continue;
        }

        let mut digits = String::new();
        while index < characters.len()
            && (characters[index].is_ascii_digit() || characters[index] == ',')
        {
            if characters[index] != ',' {
                digits.push(characters[index]);
            }
            index += 1;
        }

        let Ok(mut amount) = digits.parse::<i64>() else {
            continue;
        };
        if index < characters.len() && characters[index] == '万' {
            amount = amount.saturating_mul(10_000);
            index += 1;
        }
        amounts.push(amount);
    }

    amounts
}

/// The first amount that reads as a price (large enough to be JPY for
/// property or construction work, not a slot count or floor-plan digit).
pub fn first_price(text: &str) -> Option<i64> {
    scan_amounts(text).into_iter().find(|amount| *amount >= 100_000)
}

pub fn first_url(text: &str) -> Option<String> {
    text.split_whitespace()
        .find(|token| token.starts_with("http://") || token.starts_with("https://"))
        .map(|token| token.trim_end_matches(['.', ',', ')', '>']).to_string())
}

pub fn format_jpy(amount: i64) -> String {
    let negative = amount < 0;
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (position, character) in digits.chars().enumerate() {
        if position > 0 && (digits.len() - position) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(character);
    }
    if negative {
        format!("-¥{grouped}")
    } else {
        format!("¥{grouped}")
    }
}
