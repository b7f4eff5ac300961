//! Welcome banner display for chat sessions.

use console::style;

use qognus_core::reasoning::MarkerPair;

/// Print the welcome banner at the start of a chat session.
///
/// Shows the transport, model, and the reasoning markers being hidden.
pub fn print_welcome_banner(provider: &str, model: &str, markers: &MarkerPair) {
    println!();
    println!("  * {}", style("Qognus Copilot").cyan().bold());
    println!(
        "  {}",
        style("Ask about tickets, clusters and dashboard health").dim()
    );
    println!();
    println!("  {}  {}", style("Model:").bold(), style(model).dim());
    println!("  {}  {}", style("Provider:").bold(), style(provider).dim());
    println!(
        "  {}  {} ... {}",
        style("Hidden:").bold(),
        style(markers.open()).dim(),
        style(markers.close()).dim()
    );
    println!();
    println!(
        "  {}",
        style("Type /help for commands, Ctrl+D to exit").dim()
    );
    println!("  {}", style("---").dim());
    println!();
}
