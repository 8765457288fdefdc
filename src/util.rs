//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces `{key}` in the template with provided values in a single pass;
/// substituted values are never scanned again. Unknown keys stay as written.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = String::with_capacity(tpl.len());
  let mut rest = tpl;
  while let Some(open) = rest.find('{') {
    out.push_str(&rest[..open]);
    let after = &rest[open + 1..];
    let value = after
      .find('}')
      .and_then(|close| pairs.iter().find(|(k, _)| *k == &after[..close]).map(|(k, v)| (k.len(), *v)));
    match value {
      Some((key_len, v)) => {
        out.push_str(v);
        rest = &after[key_len + 1..];
      }
      None => {
        out.push('{');
        rest = after;
      }
    }
  }
  out.push_str(rest);
  out
}

/// Log-safe truncation for model output.
/// Cuts on a char boundary so multi-byte symbols (∑, ∫, ...) never split.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) {
    cut -= 1;
  }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}

/// Leading decimal number of a string, like `parseFloat` in a browser.
/// "0.85" -> 0.85, "0.7 (fairly sure)" -> 0.7, "about 0.7" -> None.
pub fn leading_number(s: &str) -> Option<f64> {
  let s = s.trim_start();
  let mut end = 0;
  let mut seen_digit = false;
  let mut seen_dot = false;
  for (i, ch) in s.char_indices() {
    match ch {
      '+' | '-' if i == 0 => {}
      '0'..='9' => seen_digit = true,
      '.' if !seen_dot => seen_dot = true,
      _ => break,
    }
    end = i + ch.len_utf8();
  }
  if !seen_digit {
    return None;
  }
  s[..end].trim_end_matches('.').parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn template_replaces_every_occurrence() {
    let out = fill_template("{type} then {type} at {level}", &[("type", "numeric"), ("level", "hard")]);
    assert_eq!(out, "numeric then numeric at hard");
  }

  #[test]
  fn template_values_are_not_rescanned() {
    let out = fill_template(
      "Pattern: {sequence}\nType: {type}",
      &[("sequence", "{type}, {hint}, {x"), ("type", "symbolic")],
    );
    assert_eq!(out, "Pattern: {type}, {hint}, {x\nType: symbolic");
    assert_eq!(fill_template("{unknown} {", &[("type", "t")]), "{unknown} {");
  }

  #[test]
  fn truncation_respects_char_boundaries() {
    let s = "∑∏∫∂";
    let t = trunc_for_log(s, 4);
    assert!(t.starts_with('∑'));
    assert!(t.ends_with("(12 bytes total)"));
    assert_eq!(trunc_for_log("short", 10), "short");
  }

  #[test]
  fn leading_number_behaves_like_parse_float() {
    assert_eq!(leading_number("0.85"), Some(0.85));
    assert_eq!(leading_number("  0.7 (fairly sure)"), Some(0.7));
    assert_eq!(leading_number("1."), Some(1.0));
    assert_eq!(leading_number(".5"), Some(0.5));
    assert_eq!(leading_number("about 0.7"), None);
    assert_eq!(leading_number(""), None);
    assert_eq!(leading_number("-"), None);
  }
}
