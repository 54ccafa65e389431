use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::Path;

use crate::input::InputError;
use crate::input::reader::open_maybe_gz;

pub fn load_threshold_overrides(path: &Path) -> Result<BTreeMap<String, f32>, InputError> {
    parse_threshold_overrides(open_maybe_gz(path)?)
}

/// Two tab-separated columns, `regulon` and `threshold`. An optional header
/// row starting with `regulon` is skipped, as are blank and `#` lines.
pub fn parse_threshold_overrides(
    mut reader: Box<dyn BufRead>,
) -> Result<BTreeMap<String, f32>, InputError> {
    let mut buf = String::new();
    let mut overrides = BTreeMap::new();
    let mut line_no = 0usize;

    loop {
        buf.clear();
        if reader.read_line(&mut buf)? == 0 {
            break;
        }
        line_no += 1;
        let line = buf.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split('\t').map(str::trim);
        let regulon = fields.next().unwrap_or("");
        let raw = fields.next().ok_or_else(|| {
            InputError::Parse(format!("override line {line_no}: expected regulon<TAB>threshold"))
        })?;
        if overrides.is_empty() && regulon.eq_ignore_ascii_case("regulon") {
            continue;
        }
        let value: f32 = raw.parse().map_err(|_| {
            InputError::Parse(format!("override line {line_no}: invalid threshold {raw:?}"))
        })?;
        if !value.is_finite() {
            return Err(InputError::InvalidInput(format!(
                "override for {regulon} is not finite"
            )));
        }
        if overrides.insert(regulon.to_string(), value).is_some() {
            return Err(InputError::InvalidInput(format!(
                "duplicate threshold override for {regulon}"
            )));
        }
    }

    Ok(overrides)
}
