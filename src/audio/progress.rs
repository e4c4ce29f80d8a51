//! Formato de tiempos y barra de progreso del panel.

/// Celdas de la barra de progreso
pub const BAR_LENGTH: usize = 20;

const FILLED: char = '█';
const EMPTY: char = '▒';

/// Formatea segundos enteros como `m:ss`, o `h:mm:ss` desde una hora.
pub fn format_time(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// Celdas llenas para `elapsed` sobre `duration`, redondeando.
pub fn filled_cells(elapsed: u64, duration: u64, length: usize) -> usize {
    let ratio = if duration == 0 {
        1.0
    } else {
        (elapsed as f64 / duration as f64).clamp(0.0, 1.0)
    };
    ((ratio * length as f64).round() as usize).min(length)
}

pub fn progress_bar(elapsed: u64, duration: u64) -> String {
    let filled = filled_cells(elapsed, duration, BAR_LENGTH);
    let mut bar = String::with_capacity(BAR_LENGTH * FILLED.len_utf8());
    bar.extend(std::iter::repeat(FILLED).take(filled));
    bar.extend(std::iter::repeat(EMPTY).take(BAR_LENGTH - filled));
    bar
}

/// `1:05 ████▒▒▒… 3:20`
pub fn progress_line(elapsed: u64, duration: u64) -> String {
    format!(
        "{} `{}` {}",
        format_time(elapsed.min(duration)),
        progress_bar(elapsed, duration),
        format_time(duration)
    )
}
