//! Console rendering of a release run.

use extpack_packager::{BuildSummary, Channel};

const WIDTH: usize = 55;

/// Format a byte count as `B`, `KB` or `MB`
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

fn channel_label(channel: Channel) -> &'static str {
    match channel {
        Channel::Chrome => "Chrome",
        Channel::Firefox => "Firefox",
        Channel::Github => "GitHub",
    }
}

pub fn render_summary(summary: &BuildSummary) -> String {
    let rule = "=".repeat(WIDTH);
    let description: String = summary.description.chars().take(40).collect();

    let mut lines = vec![
        rule.clone(),
        format!("  {} - Release Builder", summary.name),
        rule.clone(),
        String::new(),
        format!("  Version:     {}", summary.version),
        format!("  Description: {}...", description),
        String::new(),
        "  Packages:".to_string(),
    ];

    for channel in Channel::ALL {
        let Some(package) = summary.package(channel) else {
            continue;
        };
        let file_name = package
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let label = format!("{}:", channel_label(channel));
        lines.push(format!("    {:<14}{}", label, file_name));
        lines.push(format!("{:18}{}", "", format_size(package.size)));
    }

    lines.push(String::new());
    lines.push(format!("  Output: {}", summary.output_dir.display()));
    lines.push(rule);

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

pub fn print_summary(summary: &BuildSummary) {
    print!("{}", render_summary(summary));
}
