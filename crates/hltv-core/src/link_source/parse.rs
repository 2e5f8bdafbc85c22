//! Parse the plain-text `getlinks` response.
//!
//! A response is either a bare word (`NO_NEW_LINKS`, or an error message) or
//! a list of `;`-terminated records: `KEY=<digits>;` parameters and one
//! `<url>;<id>;` line per link.

use std::collections::HashMap;

use super::{ApiError, Link, LinkBatch};

const NO_NEW_LINKS: &str = "NO_NEW_LINKS";

/// Parse a `getlinks` body into a batch. `NO_NEW_LINKS` yields an empty batch.
pub fn parse_links_response(body: &str) -> Result<LinkBatch, ApiError> {
    let body = body.trim();
    if body.is_empty() {
        return Err(ApiError::EmptyResponse);
    }
    if !body.contains(';') {
        if body == NO_NEW_LINKS {
            return Ok(LinkBatch::empty());
        }
        return Err(ApiError::Server(body.to_string()));
    }

    let mut params: HashMap<&str, u64> = HashMap::new();
    let mut links = Vec::new();
    for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match line.find("http://").or_else(|| line.find("https://")) {
            Some(start) => links.push(parse_link_line(&line[start..])?),
            None => parse_params(line, &mut params),
        }
    }

    Ok(LinkBatch {
        links,
        interval: params.get("INTERVAL").copied(),
        list_id: narrow(&params, "LIST")?,
        link_count: params.get("LINKCOUNT").copied(),
        happy_hour_start: narrow(&params, "HHSTART")?,
        happy_hour_end: narrow(&params, "HHEND")?,
    })
}

fn narrow<T: TryFrom<u64>>(params: &HashMap<&str, u64>, key: &str) -> Result<Option<T>, ApiError> {
    params
        .get(key)
        .map(|&v| {
            T::try_from(v).map_err(|_| ApiError::Malformed(format!("{}={} out of range", key, v)))
        })
        .transpose()
}

/// `<url>;<id>;` (fields in between, if any, are ignored).
fn parse_link_line(line: &str) -> Result<Link, ApiError> {
    let fields: Vec<&str> = line
        .split(';')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect();
    let (url, id) = match fields.as_slice() {
        [url, .., id] => (*url, *id),
        _ => return Err(ApiError::Malformed(format!("link without id: {}", line))),
    };
    let id = id
        .parse::<i64>()
        .map_err(|_| ApiError::Malformed(format!("bad link id {:?} in {}", id, line)))?;
    Ok(Link {
        id,
        url: url.to_string(),
        derived_name: derived_name(url),
    })
}

/// Collect every `KEY=<digits>` token with an all-uppercase key.
fn parse_params<'a>(line: &'a str, params: &mut HashMap<&'a str, u64>) {
    for token in line.split(';') {
        let Some((key, value)) = token.trim().split_once('=') else {
            continue;
        };
        if key.is_empty() || !key.bytes().all(|b| b.is_ascii_uppercase()) {
            continue;
        }
        if let Ok(v) = value.parse::<u64>() {
            params.insert(key, v);
        }
    }
}

/// `.../123_Some_Name.avi` → `Some_Name.avi`.
fn derived_name(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let segment = path.rsplit('/').next()?;
    let name = segment
        .trim_start_matches(|c: char| c.is_ascii_digit())
        .strip_prefix('_')?;
    (!name.is_empty()).then(|| name.to_string())
}
