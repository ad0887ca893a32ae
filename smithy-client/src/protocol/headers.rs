//! Header list encoding.
//!
//! List members bound to a header are sent as a single comma-separated value.
//! Items containing a comma or a double quote are quoted, with `"` and `\`
//! escaped by a backslash. HTTP-dates are never quoted and contain a comma
//! themselves, so timestamp lists are split on every other comma instead.

use std::borrow::Cow;

use crate::error::ClientError;

/// Quote a list item if it would not survive a comma split.
pub fn quote_list_item(item: &str) -> Cow<'_, str> {
    let needs_quotes = item.is_empty()
        || item.contains([',', '"'])
        || item.starts_with(char::is_whitespace)
        || item.ends_with(char::is_whitespace);
    if !needs_quotes {
        return Cow::Borrowed(item);
    }
    let mut quoted = String::with_capacity(item.len() + 2);
    quoted.push('"');
    for c in item.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    Cow::Owned(quoted)
}

/// Join list items into one header value.
pub fn join_list<'a>(items: impl IntoIterator<Item = &'a str>) -> String {
    items
        .into_iter()
        .map(quote_list_item)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Split a comma-separated header value, honouring quoted items.
pub fn split_list(value: &str) -> Result<Vec<String>, ClientError> {
    let mut items = Vec::new();
    let mut chars = value.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        if chars.peek().is_none() {
            break;
        }

        if chars.next_if_eq(&'"').is_some() {
            let mut item = String::new();
            loop {
                match chars.next() {
                    Some('\\') => match chars.next() {
                        Some(escaped) => item.push(escaped),
                        None => return Err(unterminated(value)),
                    },
                    Some('"') => break,
                    Some(c) => item.push(c),
                    None => return Err(unterminated(value)),
                }
            }
            while chars.next_if(|c| c.is_whitespace()).is_some() {}
            match chars.next() {
                None | Some(',') => {}
                Some(c) => {
                    return Err(ClientError::deserialization(format!(
                        "unexpected `{c}` after quoted header item in `{value}`"
                    )));
                }
            }
            items.push(item);
        } else {
            let mut item = String::new();
            while let Some(c) = chars.next_if(|c| *c != ',') {
                item.push(c);
            }
            chars.next();
            items.push(item.trim_end().to_string());
        }
    }
    Ok(items)
}

/// Split a list of HTTP-dates, e.g.
/// `Mon, 16 Dec 2019 23:48:18 GMT, Tue, 17 Dec 2019 23:48:18 GMT`.
pub fn split_http_date_list(value: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut start = 0;
    let mut commas = 0;
    for (i, c) in value.char_indices() {
        if c == ',' {
            commas += 1;
            if commas % 2 == 0 {
                items.push(value[start..i].trim().to_string());
                start = i + 1;
            }
        }
    }
    let rest = value[start..].trim();
    if !rest.is_empty() {
        items.push(rest.to_string());
    }
    items
}

fn unterminated(value: &str) -> ClientError {
    ClientError::deserialization(format!("unterminated quoted header item in `{value}`"))
}
