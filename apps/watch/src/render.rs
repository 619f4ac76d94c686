use client_core::{Frame, ViewModel};

const LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

pub fn sparkline(frame: &Frame<'_>, columns: usize) -> String {
    let heights: Vec<f32> = frame.bars().map(|bar| bar.height).collect();
    if heights.is_empty() || columns == 0 {
        return String::new();
    }
    let tallest = heights.iter().copied().fold(0.0_f32, f32::max);
    let chunk = heights.len().div_ceil(columns);

    heights
        .chunks(chunk)
        .map(|group| {
            let mean = group.iter().sum::<f32>() / group.len() as f32;
            if tallest <= 0.0 {
                return LEVELS[0];
            }
            let level = ((mean / tallest) * (LEVELS.len() - 1) as f32).round() as usize;
            LEVELS[level.min(LEVELS.len() - 1)]
        })
        .collect()
}

pub fn status_line(view: &ViewModel) -> String {
    let iterations = view
        .total_iterations
        .map(|n| n.to_string())
        .unwrap_or_else(|| "Loading...".to_string());
    let started = view
        .start_date
        .map(|date| date.to_string())
        .unwrap_or_else(|| "Loading...".to_string());
    let finished = view
        .end_date
        .map(|date| date.to_string())
        .unwrap_or_else(|| "Maybe some day".to_string());
    let mut line = format!(
        "{}{} | speed: {} | shuffles: {} | length: {} | started: {} | finished: {}",
        view.title,
        view.title_suffix,
        view.speed_label,
        iterations,
        view.sequence_length,
        started,
        finished
    );
    if let Some(url) = &view.previous_url {
        line.push_str(" | previous: ");
        line.push_str(url);
    }
    if let Some(url) = &view.next_url {
        line.push_str(" | next: ");
        line.push_str(url);
    }
    if let Some(message) = &view.error_message {
        line.push_str(" | ");
        line.push_str(message);
    }
    line
}
