//! Numeric field parsers for prober output.
//!
//! Probers report per-substream alternatives separated by `/`
//! (`"48000 / 24000"`, `"8 / 6"`). Bitrate, sample rate, channel count and
//! delay take the **first** alternative; bits-per-sample takes the **last**.
//! The two backends disagree on which position is authoritative and both
//! conventions are kept as they are.
//!
//! Every parser returns `None` on input it cannot read; nothing here fails.

fn first_alternative(value: &str) -> &str {
    value.split('/').next().unwrap_or("").trim()
}

fn last_alternative(value: &str) -> &str {
    value.rsplit('/').next().unwrap_or("").trim()
}

// Frame rates are rationals (`30000/1001`), so only a spaced `/` separates
// their alternatives.
fn first_spaced_alternative(value: &str) -> &str {
    value.split(" / ").next().unwrap_or("").trim()
}

/// Drop thousands separators (`"1 411 200"`) and trailing units.
fn leading_number(value: &str) -> Option<f64> {
    let compact: String = value
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ' ' || *c == '.' || *c == '-' || *c == '\u{a0}')
        .filter(|c| !c.is_whitespace())
        .collect();
    if compact.is_empty() {
        return None;
    }
    compact.parse().ok()
}

/// Bitrate in bits per second. Accepts `kb/s` / `Mb/s` suffixes.
pub fn parse_bitrate(value: &str) -> Option<u32> {
    let units = value.to_lowercase().replace("b/s", "bps");
    let v = first_alternative(&units);
    let n = leading_number(v)?;
    let scaled = if v.contains("mbps") {
        n * 1_000_000.0
    } else if v.contains("kbps") {
        n * 1000.0
    } else {
        n
    };
    if scaled <= 0.0 || scaled > u32::MAX as f64 {
        return None;
    }
    Some(scaled.round() as u32)
}

/// Sample rate in Hz. Accepts `Hz` / `kHz` suffixes (`"44.1 kHz"` → 44100).
pub fn parse_sample_rate(value: &str) -> Option<u32> {
    let v = first_alternative(value).to_lowercase();
    let n = leading_number(&v)?;
    let hz = if v.contains("khz") { n * 1000.0 } else { n };
    if hz <= 0.0 || hz > u32::MAX as f64 {
        return None;
    }
    Some(hz.round() as u32)
}

/// Channel count. Accepts `"6"`, `"2 channels"` and layout names
/// (`mono`, `stereo`, `5.1(side)`, `7.1`).
pub fn parse_channels(value: &str) -> Option<u32> {
    let v = first_alternative(value).to_lowercase();
    let layout = v.split('(').next().unwrap_or("").trim();
    let named = match layout {
        "mono" => Some(1),
        "stereo" | "downmix" => Some(2),
        "2.1" | "3.0" => Some(3),
        "quad" | "4.0" | "3.1" => Some(4),
        "5.0" | "4.1" => Some(5),
        "5.1" | "6.0" => Some(6),
        "6.1" | "7.0" => Some(7),
        "7.1" => Some(8),
        _ => None,
    };
    if named.is_some() {
        return named;
    }
    let digits = layout
        .trim_end_matches("channels")
        .trim_end_matches("channel")
        .trim();
    digits.parse::<u32>().ok().filter(|n| *n > 0)
}

/// Bits per sample, taken from the **last** alternative.
pub fn parse_bits_per_sample(value: &str) -> Option<u32> {
    let v = last_alternative(value).to_lowercase();
    let digits = v.trim_end_matches("bits").trim_end_matches("bit").trim();
    digits.parse::<u32>().ok().filter(|n| *n > 0)
}

/// Audio delay relative to video, in milliseconds.
pub fn parse_delay(value: &str) -> Option<i32> {
    let v = first_alternative(value).to_lowercase();
    let digits = v.trim_end_matches("ms").trim();
    digits.parse::<f64>().ok().map(|ms| ms.round() as i32)
}

/// Duration in seconds. Accepts `HH:MM:SS(.ss)` and plain decimal seconds.
pub fn parse_duration(value: &str) -> Option<f64> {
    if value.trim().eq_ignore_ascii_case("n/a") {
        return None;
    }
    let v = first_alternative(value);
    let secs = if v.contains(':') {
        let mut total = 0.0;
        for part in v.split(':') {
            total = total * 60.0 + part.trim().parse::<f64>().ok()?;
        }
        total
    } else {
        v.parse::<f64>().ok()?
    };
    (secs.is_finite() && secs >= 0.0).then_some(secs)
}

/// Pixel dimension (`"1 920 pixels"` → 1920).
pub fn parse_dimension(value: &str) -> Option<u32> {
    let n = leading_number(first_alternative(value))?;
    (n >= 1.0 && n <= u32::MAX as f64).then(|| n as u32)
}

/// Normalise a frame rate to a plain decimal string (`"23.976 FPS"` → `"23.976"`).
pub fn parse_frame_rate(value: &str) -> Option<String> {
    let v = first_spaced_alternative(value);
    let token = v.split_whitespace().next()?;
    let rate: f64 = if let Some((num, den)) = token.split_once('/') {
        num.parse::<f64>().ok()? / den.parse::<f64>().ok().filter(|d| *d > 0.0)?
    } else {
        token.parse().ok()?
    };
    if !(rate > 0.0 && rate.is_finite()) {
        return None;
    }
    let s = format!("{rate:.3}");
    Some(s.trim_end_matches('0').trim_end_matches('.').to_string())
}
