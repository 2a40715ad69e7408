// ETP - Execution Trace Prediction
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Rendering of training artifacts: masked code plus a trailing label.

use etp_common::{
    Number, Position, Site, Snippet, SpliceError, VariableState, PAIR_SEPARATOR, VALUE_SEPARATOR,
};

/// Written in place of a masked token
pub const MASK_PLACEHOLDER: &str = "?";

/// Prefix of the label line appended to the code
pub const LABEL_PREFIX: &str = "\n# ";

/// Prefix of a highlighted line
pub const HIGHLIGHT_MARKER: char = '@';

/// Separates a highlighted line from its state
pub const STATE_MARKER: char = '$';

fn pair(name: &str, value: impl std::fmt::Display) -> String {
    format!("{name}{VALUE_SEPARATOR}{value}")
}

/// `count?<n>`
pub fn count_label(count: usize) -> String {
    pair("count", count)
}

/// `name1?value1;name2?value2`
pub fn state_label(state: &VariableState) -> String {
    state.encode()
}

/// `<state>;operator?<symbol>`, or `operator?<symbol>` for an empty state
pub fn operator_label(state: Option<&VariableState>, symbol: char) -> String {
    let operator = pair("operator", symbol);
    match state.filter(|state| !state.is_empty()) {
        Some(state) => format!("{}{PAIR_SEPARATOR}{operator}", state.encode()),
        None => operator,
    }
}

/// `input?<value>`
pub fn input_label(value: Number) -> String {
    pair("input", value)
}

/// Append `label` to `code` as a trailing comment line
pub fn append_label(code: &Snippet, label: &str) -> String {
    format!("{code}{LABEL_PREFIX}{label}")
}

/// Mark `line` as `@<line text>$<state>`
pub fn highlight(code: &Snippet, line: usize, state: &str) -> Result<Snippet, SpliceError> {
    code.map_line(line, |text| Ok(format!("{HIGHLIGHT_MARKER}{text}{STATE_MARKER}{state}")))
}

/// Replace the operator character at `position` with the placeholder
pub fn mask_operator(code: &Snippet, position: Position) -> Result<Snippet, SpliceError> {
    code.splice(&Site::char_at(position), MASK_PLACEHOLDER)
}

/// Replace the literal covering `site` with the placeholder
pub fn mask_literal(code: &Snippet, site: &Site) -> Result<Snippet, SpliceError> {
    code.splice(site, MASK_PLACEHOLDER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        let state: VariableState = [("a", "8"), ("b", "[1, 2]")].into_iter().collect();
        assert_eq!(count_label(7), "count?7");
        assert_eq!(state_label(&state), "a?8;b?[1, 2]");
        assert_eq!(operator_label(Some(&state), '+'), "a?8;b?[1, 2];operator?+");
        assert_eq!(operator_label(Some(&VariableState::new()), '<'), "operator?<");
        assert_eq!(operator_label(None, '-'), "operator?-");
        assert_eq!(input_label(Number::Int(-3)), "input?-3");
        assert_eq!(input_label(Number::Float(2.5)), "input?2.5");
    }

    #[test]
    fn test_masked_artifact() {
        let code = Snippet::new("a = 5 + 3\nb = a * 2");
        let masked = mask_operator(&code, Position::new(1, 6)).unwrap();
        let highlighted = highlight(&masked, 2, "a?8").unwrap();
        let artifact = append_label(&highlighted, &operator_label(None, '+'));
        assert_eq!(artifact, "a = 5 ? 3\n@b = a * 2$a?8\n# operator?+");
    }

    #[test]
    fn test_mask_literal() {
        let code = Snippet::new("x = -12\ny = x");
        let site = Site { line: 1, columns: 4..7 };
        assert_eq!(mask_literal(&code, &site).unwrap().source(), "x = ?\ny = x");
        assert!(mask_literal(&code, &Site { line: 3, columns: 0..1 }).is_err());
    }
}
