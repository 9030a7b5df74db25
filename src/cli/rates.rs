use super::ui;
use crate::core::{Conversions, Rates, to_query};
use crate::rates::CurrencyConverter;
use anyhow::Result;
use comfy_table::Cell;

/// Queries for `from -> to` for every target, in the order given.
pub fn queries_for(from: &str, to: &[String]) -> Vec<String> {
    to.iter()
        .map(|target| to_query(Some(from), Some(target)))
        .collect()
}

fn sorted_keys<V>(map: &std::collections::HashMap<String, V>) -> Vec<&String> {
    let mut keys: Vec<_> = map.keys().collect();
    keys.sort();
    keys
}

fn stale_note(any_expired: bool) -> String {
    if any_expired {
        format!(
            "\n\n{}",
            ui::style_text(
                "Some rates could not be refreshed and may be outdated.",
                ui::StyleType::Warning
            )
        )
    } else {
        String::new()
    }
}

pub fn rates_table(rates: &Rates) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Pair"),
        ui::header_cell("Rate"),
        ui::header_cell("Status"),
    ]);

    for query in sorted_keys(rates) {
        let rate = &rates[query];
        table.add_row(vec![
            Cell::new(query),
            ui::number_cell(rate.val, 4),
            ui::status_cell(rate.expired),
        ]);
    }

    let mut output = format!(
        "{}\n\n",
        ui::style_text("Exchange rates", ui::StyleType::Title)
    );
    output.push_str(&table.to_string());
    output.push_str(&stale_note(rates.values().any(|r| r.expired)));
    output
}

pub fn conversions_table(amount: f64, conversions: &Conversions) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Pair"),
        ui::header_cell("Rate"),
        ui::header_cell("Amount"),
        ui::header_cell("Status"),
    ]);

    for query in sorted_keys(conversions) {
        let conversion = &conversions[query];
        table.add_row(vec![
            Cell::new(query),
            ui::number_cell(conversion.val, 4),
            ui::number_cell(conversion.amount, 2),
            ui::status_cell(conversion.expired),
        ]);
    }

    let mut output = format!(
        "{} {}\n\n",
        ui::style_text("Converting", ui::StyleType::Title),
        ui::style_text(&format!("{amount:.2}"), ui::StyleType::Subtle)
    );
    output.push_str(&table.to_string());
    output.push_str(&stale_note(conversions.values().any(|c| c.expired)));
    output
}

pub async fn run_rate(converter: &CurrencyConverter, from: &str, to: &[String]) -> Result<()> {
    let queries = queries_for(from, to);
    let pb = ui::new_spinner("Fetching rates...");
    let result = converter.get_rate(&queries).await;
    pb.finish_and_clear();

    println!("{}", rates_table(&result?));
    Ok(())
}

pub async fn run_convert(
    converter: &CurrencyConverter,
    amount: f64,
    from: &str,
    to: &[String],
) -> Result<()> {
    let queries = queries_for(from, to);
    let pb = ui::new_spinner("Converting...");
    let result = converter.convert_amount(amount, &queries).await;
    pb.finish_and_clear();

    println!("{}", conversions_table(amount, &result?));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Conversion, Rate};

    #[test]
    fn test_queries_for() {
        let to = vec!["USD".to_string(), "JPY".to_string()];
        assert_eq!(queries_for("EUR", &to), vec!["EUR_USD", "EUR_JPY"]);
        assert!(queries_for("EUR", &[]).is_empty());
    }

    #[test]
    fn test_rates_table() {
        let rates = Rates::from([
            (
                "EUR_USD".to_string(),
                Rate {
                    val: 1.1,
                    expired: false,
                },
            ),
            (
                "EUR_JPY".to_string(),
                Rate {
                    val: 160.25,
                    expired: true,
                },
            ),
        ]);
        let output = rates_table(&rates);
        assert!(output.contains("EUR_USD"));
        assert!(output.contains("1.1000"));
        assert!(output.contains("160.2500"));
        assert!(output.contains("expired"));
        assert!(output.contains("may be outdated"));
        assert!(output.find("EUR_JPY").unwrap() < output.find("EUR_USD").unwrap());
    }

    #[test]
    fn test_conversions_table() {
        let conversions = Conversions::from([(
            "USD_EUR".to_string(),
            Conversion {
                val: 0.9,
                expired: false,
                amount: 90.0,
            },
        )]);
        let output = conversions_table(100.0, &conversions);
        assert!(output.contains("USD_EUR"));
        assert!(output.contains("90.00"));
        assert!(output.contains("fresh"));
        assert!(!output.contains("may be outdated"));
    }
}
