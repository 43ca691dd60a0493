//! Turning command-line text into slices and buffers, and back.

use anyhow::{anyhow, bail, Context, Result};
use slice_core::{
    ByteSlice, ColorSlice, ColorSpace, DoubleSlice, FloatSlice, Hsla, Rgba, Slice, SliceKind,
    StringSlice, UShortSlice,
};

/// Build a slice of `kind` from its index and the textual value.
///
/// An empty value stands for the kind's default.
pub(crate) fn parse_slice(kind: SliceKind, index: u64, value: &str) -> Result<Slice> {
    let value = value.trim();

    let slice = match kind {
        SliceKind::ByteSlice => ByteSlice::new(index, from_hex(value)?).into(),
        SliceKind::ColorSlice => ColorSlice::new(narrow(kind, index)?, parse_color(value)?).into(),
        SliceKind::DoubleSlice => DoubleSlice::new(index, parse_or_default(value)?).into(),
        SliceKind::FloatSlice => FloatSlice::new(index, parse_or_default(value)?).into(),
        SliceKind::StringSlice => StringSlice::new(index, value.to_string()).into(),
        SliceKind::UShortSlice => UShortSlice::new(narrow(kind, index)?, parse_or_default(value)?).into(),
    };

    Ok(slice)
}

fn narrow<T: TryFrom<u64>>(kind: SliceKind, index: u64) -> Result<T> {
    T::try_from(index).map_err(|_| anyhow!("index {} does not fit a {} slice", index, kind))
}

fn parse_or_default<T>(value: &str) -> Result<T>
where
    T: std::str::FromStr + Default,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value.is_empty() {
        true => Ok(T::default()),
        false => value
            .parse()
            .with_context(|| format!("invalid value {:?}", value)),
    }
}

/// Parse `rgba:r,g,b,a`, `hsla:h,s,l,a`, or `none` (also the empty string).
pub(crate) fn parse_color(value: &str) -> Result<Option<ColorSpace>> {
    if value.is_empty() || value.eq_ignore_ascii_case("none") {
        return Ok(None);
    }

    let (space, channels) = value
        .split_once(':')
        .ok_or_else(|| anyhow!("expected `rgba:...` or `hsla:...`, got {:?}", value))?;
    let channels = channels.split(',').map(str::trim).collect::<Vec<_>>();
    let [a, b, c, d] = channels.as_slice() else {
        bail!("a color needs 4 channels, got {}", channels.len());
    };

    let color = match space.to_ascii_lowercase().as_str() {
        "rgba" => ColorSpace::Rgba(Rgba {
            red: parse_or_default(a)?,
            green: parse_or_default(b)?,
            blue: parse_or_default(c)?,
            alpha: parse_or_default(d)?,
        }),
        "hsla" => ColorSpace::Hsla(Hsla {
            hue: parse_or_default(a)?,
            saturation: parse_or_default(b)?,
            lightness: parse_or_default(c)?,
            alpha: parse_or_default(d)?,
        }),
        other => bail!("unknown color space {:?}", other),
    };

    Ok(Some(color))
}

pub(crate) fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Decode hex text. Whitespace and an optional `0x` prefix are ignored.
pub(crate) fn from_hex(text: &str) -> Result<Vec<u8>> {
    let text = text.trim();
    let digits = text
        .strip_prefix("0x")
        .unwrap_or(text)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<Vec<_>>();

    if digits.len() % 2 != 0 {
        bail!("hex input has an odd number of digits");
    }

    digits
        .chunks(2)
        .map(|pair| {
            let pair = pair.iter().collect::<String>();
            u8::from_str_radix(&pair, 16).with_context(|| format!("invalid hex byte {:?}", pair))
        })
        .collect()
}
