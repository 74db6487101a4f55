pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// Population standard deviation.
pub fn std_dev(data: &[f64]) -> Option<f64> {
    let m = mean(data)?;
    let variance = data.iter().map(|v| (v - m).powi(2)).sum::<f64>() / data.len() as f64;
    Some(variance.sqrt())
}

/// `part / whole` as a rounded percentage, or `empty` when `whole` is zero.
pub fn rounded_percent(part: usize, whole: usize, empty: u8) -> u8 {
    if whole == 0 {
        return empty;
    }
    ((part as f64 / whole as f64) * 100.0).round().min(100.0) as u8
}
