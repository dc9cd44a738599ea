//! Output formatting for the CLI.

use console::style;
use larek_core::catalog::{Category, Product};

/// Output handler for CLI messages.
#[derive(Clone)]
pub struct Output {
    verbose: bool,
    json: bool,
}

impl Output {
    /// Create a new output handler.
    pub fn new(verbose: bool, json: bool) -> Self {
        Self { verbose, json }
    }

    /// Print an info message.
    pub fn info(&self, msg: &str) {
        if self.json {
            return;
        }
        println!("{} {}", style("ℹ").blue(), msg);
    }

    /// Print a success message.
    pub fn success(&self, msg: &str) {
        if self.json {
            return;
        }
        println!("{} {}", style("✓").green(), msg);
    }

    /// Print a warning message.
    pub fn warn(&self, msg: &str) {
        if self.json {
            return;
        }
        eprintln!("{} {}", style("⚠").yellow(), msg);
    }

    /// Print an error message.
    pub fn error(&self, msg: &str) {
        if self.json {
            eprintln!("{}", serde_json::json!({ "error": msg }));
            return;
        }
        eprintln!("{} {}", style("✗").red(), style(msg).red());
    }

    /// Print a debug message (only in verbose mode).
    pub fn debug(&self, msg: &str) {
        if !self.verbose || self.json {
            return;
        }
        eprintln!("{} {}", style("→").dim(), style(msg).dim());
    }

    /// Print a header/title.
    pub fn header(&self, msg: &str) {
        if self.json {
            return;
        }
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a step in a process.
    pub fn step(&self, num: usize, total: usize, msg: &str) {
        if self.json {
            return;
        }
        println!("{} {}", style(format!("[{}/{}]", num, total)).dim(), msg);
    }

    /// Print JSON output.
    pub fn json<T: serde::Serialize>(&self, value: &T) {
        if let Ok(json) = serde_json::to_string_pretty(value) {
            println!("{}", json);
        }
    }

    /// Print a key-value pair.
    pub fn kv(&self, key: &str, value: &str) {
        if self.json {
            return;
        }
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(&self, item: &str) {
        if self.json {
            return;
        }
        println!("  {} {}", style("•").dim(), item);
    }

    /// Print one catalog product as a table row.
    pub fn product_row(&self, product: &Product, in_basket: bool) {
        if self.json {
            return;
        }
        let marker = if in_basket {
            style("●").green().to_string()
        } else {
            " ".to_string()
        };
        println!(
            "  {} {:10}  {:32}  {:16}  {}",
            marker,
            product.id.as_str(),
            product.title,
            category_badge(product),
            format_price(product.price)
        );
    }

    /// Check if JSON mode is enabled.
    pub fn is_json(&self) -> bool {
        self.json
    }
}

/// Category label colored like the storefront's card badges.
pub fn category_badge(product: &Product) -> String {
    let label = product.category.as_str();
    match product.category {
        Category::SoftSkill => style(label).green().to_string(),
        Category::HardSkill => style(label).magenta().to_string(),
        Category::Button => style(label).blue().to_string(),
        Category::Additional => style(label).cyan().to_string(),
        Category::Other => style(label).yellow().to_string(),
    }
}

/// Format a card price the way the storefront displays it. A missing or
/// zero price reads as priceless.
pub fn format_price(price: Option<u64>) -> String {
    match price {
        Some(amount) if amount > 0 => format_amount(amount),
        _ => "Бесценно".to_string(),
    }
}

/// Format a sum of synapses with space-separated thousands.
pub fn format_amount(amount: u64) -> String {
    let digits = amount.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(digit);
    }
    format!("{} синапсов", grouped)
}
