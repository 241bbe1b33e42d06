// Sparkline and bar rendering for the statistics panels
use errwatch_core::DailyBucket;

/// Generate a sparkline visualization using Unicode block characters
/// Characters: ▁ ▂ ▃ ▄ ▅ ▆ ▇ █
pub fn render_sparkline(data: &[f64]) -> String {
    if data.is_empty() {
        return String::new();
    }

    let chars = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
    let max = data.iter().cloned().fold(0.0f64, f64::max);

    if max == 0.0 {
        return "▁".repeat(data.len());
    }

    data.iter()
        .map(|&v| {
            let ratio = (v / max * 7.0).clamp(0.0, 7.0);
            chars[ratio as usize]
        })
        .collect()
}

/// One character per day, oldest on the left
///
/// Only the most recent `max_days` buckets are drawn when there are more.
pub fn daily_sparkline(buckets: &[DailyBucket], max_days: usize) -> String {
    let skip = buckets.len().saturating_sub(max_days);
    let counts: Vec<f64> = buckets.iter().skip(skip).map(|b| b.count as f64).collect();
    render_sparkline(&counts)
}

/// Horizontal bar `width` cells wide, filled to `percent`
pub fn share_bar(percent: f64, width: usize) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    let filled = filled.min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}
