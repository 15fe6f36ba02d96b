/* src/server/core/rust/src/locale.rs */

/// Fallback when no supported locale matches the request.
pub const DEFAULT_LOCALE: &str = "en-US";

/// Query-string parameter that forces a locale, e.g. `/?__locale=fr-FR`.
pub const LOCALE_OVERRIDE_PARAM: &str = "__locale";

/// Pick the best supported locale for a request.
/// Order: `__locale` query override -> Accept-Language -> `en-US`.
pub fn negotiate_locale(
  raw_query: Option<&str>,
  accept_language: Option<&str>,
  supported: &[String],
) -> String {
  if let Some(loc) = raw_query.and_then(|q| query_override(q, supported)) {
    return loc;
  }
  if let Some(loc) = accept_language.and_then(|h| parse_accept_language(h, supported)) {
    return loc;
  }
  DEFAULT_LOCALE.to_string()
}

fn find_supported<'a>(tag: &str, supported: &'a [String]) -> Option<&'a String> {
  supported.iter().find(|s| s.eq_ignore_ascii_case(tag))
}

fn primary_subtag(tag: &str) -> &str {
  tag.split(['-', '_']).next().unwrap_or(tag)
}

fn query_override(raw_query: &str, supported: &[String]) -> Option<String> {
  raw_query
    .split('&')
    .filter_map(|pair| pair.split_once('='))
    .find(|(k, _)| *k == LOCALE_OVERRIDE_PARAM)
    .and_then(|(_, v)| find_supported(v, supported))
    .cloned()
}

fn parse_accept_language(header: &str, supported: &[String]) -> Option<String> {
  if header.trim().is_empty() {
    return None;
  }

  let mut entries: Vec<(&str, f64)> = Vec::new();
  for part in header.split(',') {
    let part = part.trim();
    if part.is_empty() {
      continue;
    }
    let mut segments = part.split(';');
    let lang = segments.next().unwrap_or("").trim();
    let mut q = 1.0_f64;
    for s in segments {
      if let Some(val) = s.trim().strip_prefix("q=") {
        if let Ok(v) = val.parse::<f64>() {
          q = v;
        }
      }
    }
    if q > 0.0 && lang != "*" {
      entries.push((lang, q));
    }
  }

  // Stable sort keeps header order among equal q-values
  entries.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

  for (lang, _) in &entries {
    if let Some(exact) = find_supported(lang, supported) {
      return Some(exact.clone());
    }
    // Primary subtag match: fr -> fr-FR, fr-CA -> fr-FR
    let prefix = primary_subtag(lang);
    if let Some(loose) = supported.iter().find(|s| primary_subtag(s).eq_ignore_ascii_case(prefix)) {
      return Some(loose.clone());
    }
  }

  None
}
