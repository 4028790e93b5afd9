// Copyright 2019 Karl Sundequist Blomdahl <karl.sundequist.blomdahl@gmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The external game-transcript format: a single parenthesised, SGF-like
//! record with a setup node followed by one node per move. This module
//! only understands the properties listed in the specification -- every
//! other key is parsed (so the bracket-scanner doesn't choke on it) and
//! silently dropped.

use kr_utils::ParseError;

use crate::geometry::{Color, Geometry, Point};

/// One parsed move node: `B[pt]` / `W[pt]`, with an optional trailing
/// `.<border-pts>` (the enclosure actually captured) and `!<pt>` (a
/// forced enclosure around a given point).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SgfMove {
    pub who: Color,
    pub point: Point,
    pub border_points: Vec<Point>,
    pub force_around: Option<Point>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GameRecord {
    pub width: usize,
    pub height: usize,
    pub setup_black: Vec<Point>,
    pub setup_white: Vec<Point>,
    pub moves: Vec<SgfMove>,
    pub result: Option<String>,
    pub player_black: Option<String>,
    pub player_white: Option<String>,
    pub rules: Option<String>,
    /// `RU[...]` carried `Stop=1`: two consecutive dame moves end the
    /// game immediately rather than merely biasing the playout policy.
    pub stop_on_two_dame: bool,
}

/// Parses a full transcript: `(` setup-node `;`move-node`;`move-node... `)`.
/// `SZ` must appear before any move node. Trailing content after the
/// closing `)` (e.g. a millisecond override, see §6) is ignored here --
/// callers that care about it should slice it off first.
pub fn parse(text: &str) -> Result<GameRecord, ParseError> {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix('(')
        .and_then(|s| find_matching_close(s))
        .ok_or_else(|| ParseError::Malformed("expected a ( ... ) record".to_string()))?;

    let nodes = split_nodes(inner);
    if nodes.is_empty() {
        return Err(ParseError::Malformed("empty record".to_string()));
    }

    let mut record = GameRecord::default();
    let mut geo: Option<Geometry> = None;

    for (i, node_text) in nodes.iter().enumerate() {
        let props = parse_properties(node_text)?;

        for (key, values) in props {
            match key.as_str() {
                "SZ" => {
                    if geo.is_some() {
                        continue; // only the first SZ counts
                    }
                    let (w, h) = parse_size(values.first().map(String::as_str).unwrap_or(""))?;
                    record.width = w;
                    record.height = h;
                    geo = Some(Geometry::new(w, h));
                }
                "AB" => {
                    let geo = geo.as_ref().ok_or(ParseError::MissingProperty("SZ"))?;
                    for v in values {
                        record.setup_black.push(geo.sgf_to_point(&v)?);
                    }
                }
                "AW" => {
                    let geo = geo.as_ref().ok_or(ParseError::MissingProperty("SZ"))?;
                    for v in values {
                        record.setup_white.push(geo.sgf_to_point(&v)?);
                    }
                }
                "B" | "W" => {
                    let geo = geo.as_ref().ok_or(ParseError::MissingProperty("SZ"))?;
                    let who = if key == "B" { Color::Black } else { Color::White };
                    let value = values.first().map(String::as_str).unwrap_or("");
                    record.moves.push(decode_move(geo, who, value)?);
                }
                "RE" => record.result = values.into_iter().next(),
                "PB" => record.player_black = values.into_iter().next(),
                "PW" => record.player_white = values.into_iter().next(),
                "RU" => {
                    let v = values.into_iter().next().unwrap_or_default();
                    record.stop_on_two_dame = v.contains("Stop=1");
                    record.rules = Some(v);
                }
                _ => {} // ignored property
            }
        }

        if i == 0 && geo.is_none() {
            return Err(ParseError::MissingProperty("SZ"));
        }
    }

    Ok(record)
}

/// Emits `record` back into the canonical textual form -- only the
/// recognised properties round-trip; anything the parser dropped stays
/// dropped.
pub fn emit(record: &GameRecord) -> String {
    let geo = Geometry::new(record.width, record.height);
    let mut out = String::from("(;");

    out.push_str(&format!("SZ[{}:{}]", record.width, record.height));
    for &p in &record.setup_black {
        out.push_str(&format!("AB[{}]", geo.point_to_sgf(p)));
    }
    for &p in &record.setup_white {
        out.push_str(&format!("AW[{}]", geo.point_to_sgf(p)));
    }
    if let Some(pb) = &record.player_black {
        out.push_str(&format!("PB[{}]", pb));
    }
    if let Some(pw) = &record.player_white {
        out.push_str(&format!("PW[{}]", pw));
    }
    if let Some(ru) = &record.rules {
        out.push_str(&format!("RU[{}]", ru));
    }

    for mv in &record.moves {
        let key = if mv.who == Color::Black { "B" } else { "W" };
        out.push(';');
        out.push_str(key);
        out.push('[');
        out.push_str(&geo.point_to_sgf(mv.point));
        for &b in &mv.border_points {
            out.push('.');
            out.push_str(&geo.point_to_sgf(b));
        }
        if let Some(f) = mv.force_around {
            out.push('!');
            out.push_str(&geo.point_to_sgf(f));
        }
        out.push(']');
    }

    if let Some(re) = &record.result {
        out.push_str(&format!(";RE[{}]", re));
    }

    out.push(')');
    out
}

fn decode_move(geo: &Geometry, who: Color, value: &str) -> Result<SgfMove, ParseError> {
    let (head, force_around) = match value.split_once('!') {
        Some((h, f)) => (h, Some(geo.sgf_to_point(f)?)),
        None => (value, None),
    };

    let mut parts = head.split('.');
    let pt = parts
        .next()
        .ok_or_else(|| ParseError::Malformed("empty move value".to_string()))?;
    let point = geo.sgf_to_point(pt)?;

    let mut border_points = Vec::new();
    for part in parts {
        border_points.push(geo.sgf_to_point(part)?);
    }

    Ok(SgfMove { who, point, border_points, force_around })
}

fn parse_size(v: &str) -> Result<(usize, usize), ParseError> {
    if let Some((w, h)) = v.split_once(':') {
        let w: usize = w.parse().map_err(|_| ParseError::Malformed(format!("bad SZ value {:?}", v)))?;
        let h: usize = h.parse().map_err(|_| ParseError::Malformed(format!("bad SZ value {:?}", v)))?;
        Ok((w, h))
    } else {
        let n: usize = v.parse().map_err(|_| ParseError::Malformed(format!("bad SZ value {:?}", v)))?;
        Ok((n, n))
    }
}

/// Finds the index (within `s`, the text *after* the opening `(`) of the
/// matching top-level `)`. There are no nested parenthesised variations
/// in this format, so the first unescaped `)` always matches.
fn find_matching_close(s: &str) -> Option<&str> {
    let end = s.find(')')?;
    Some(&s[..end])
}

/// Splits the inner record body into per-node texts on `;`, dropping the
/// (possibly empty) leading fragment before the first `;`.
fn split_nodes(inner: &str) -> Vec<String> {
    inner
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Scans `KEY[value][value]...` tokens out of one node's text.
fn parse_properties(s: &str) -> Result<Vec<(String, Vec<String>)>, ParseError> {
    let chars: Vec<char> = s.chars().collect();
    let mut i = 0;
    let mut props = Vec::new();

    while i < chars.len() {
        if chars[i].is_whitespace() {
            i += 1;
            continue;
        }

        let key_start = i;
        while i < chars.len() && chars[i].is_ascii_uppercase() {
            i += 1;
        }
        if i == key_start {
            return Err(ParseError::Malformed(format!("unexpected character {:?} in node {:?}", chars[i], s)));
        }
        let key: String = chars[key_start..i].iter().collect();

        let mut values = Vec::new();
        while i < chars.len() && chars[i] == '[' {
            i += 1;
            let val_start = i;
            while i < chars.len() && chars[i] != ']' {
                i += 1;
            }
            if i >= chars.len() {
                return Err(ParseError::Malformed(format!("unterminated [ in node {:?}", s)));
            }
            values.push(chars[val_start..i].iter().collect());
            i += 1;
        }

        props.push((key, values));
    }

    Ok(props)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_size_and_setup_dots() {
        let record = parse("(;SZ[9]AB[aa][bb]AW[cc])").unwrap();

        assert_eq!(record.width, 9);
        assert_eq!(record.height, 9);
        assert_eq!(record.setup_black.len(), 2);
        assert_eq!(record.setup_white.len(), 1);
    }

    #[test]
    fn parses_rectangular_size() {
        let record = parse("(;SZ[7:11])").unwrap();

        assert_eq!(record.width, 7);
        assert_eq!(record.height, 11);
    }

    #[test]
    fn missing_sz_before_a_move_is_an_error() {
        let err = parse("(;B[aa])").unwrap_err();
        assert!(matches!(err, ParseError::MissingProperty("SZ")));
    }

    #[test]
    fn parses_moves_with_border_and_force_suffixes() {
        let record = parse("(;SZ[9];B[cc.bb.bd!aa];W[dd])").unwrap();

        assert_eq!(record.moves.len(), 2);
        let first = &record.moves[0];
        assert_eq!(first.who, Color::Black);
        assert_eq!(first.border_points.len(), 2);
        assert!(first.force_around.is_some());

        assert_eq!(record.moves[1].who, Color::White);
        assert!(record.moves[1].border_points.is_empty());
    }

    #[test]
    fn rules_stop_flag_is_recognised() {
        let record = parse("(;SZ[9]RU[Stop=1])").unwrap();
        assert!(record.stop_on_two_dame);
    }

    #[test]
    fn emit_then_parse_round_trips_the_recognised_properties() {
        let original = parse("(;SZ[9]AB[aa]AW[bb]PB[alice]PW[bob];B[cc.bb!aa];W[dd];RE[B+3])").unwrap();
        let text = emit(&original);
        let reparsed = parse(&text).unwrap();

        assert_eq!(original, reparsed);
    }

    #[test]
    fn bad_coordinate_is_reported() {
        let err = parse("(;SZ[9];B[1a])").unwrap_err();
        assert!(matches!(err, ParseError::BadCoordinate { .. }));
    }
}
