use faultloc_symbols::{PythonAnalyzer, SymbolKind};
use pretty_assertions::assert_eq;

const SOURCE: &str = r#"import logging

LOG = logging.getLogger(__name__)


class Parser:
    strict = True

    def parse(self, text):
        if not text:
            return None
        return self._split(text)

    def _split(self, text):
        return text.split(",")


def main():
    Parser().parse("a,b")
"#;

fn enclosing(line: usize) -> Option<(SymbolKind, String)> {
    let mut analyzer = PythonAnalyzer::new().unwrap();
    let parsed = analyzer.analyze("tool/parser.py", "tool.parser", SOURCE).unwrap();
    parsed
        .symbols
        .find_enclosing_symbol(line)
        .map(|e| (e.kind, e.qualified_name.clone()))
}

#[test]
fn methods_win_over_their_class() {
    assert_eq!(
        enclosing(11),
        Some((SymbolKind::Function, "tool.parser.Parser.parse".to_string()))
    );
    assert_eq!(
        enclosing(15),
        Some((SymbolKind::Function, "tool.parser.Parser._split".to_string()))
    );
}

#[test]
fn class_body_statements_map_to_class_elements() {
    assert_eq!(
        enclosing(7),
        Some((
            SymbolKind::ClassElement,
            "tool.parser.Parser.<class_element>#Assign#0".to_string()
        ))
    );
}

#[test]
fn blank_lines_between_symbols_have_no_owner() {
    assert_eq!(enclosing(4), None);
    assert_eq!(enclosing(8), None);
}

#[test]
fn module_level_statements_are_indexed() {
    assert_eq!(
        enclosing(3),
        Some((
            SymbolKind::ModuleSymbol,
            "tool.parser.<module_symbol>#Assign#1".to_string()
        ))
    );
    assert_eq!(
        enclosing(19),
        Some((SymbolKind::Function, "tool.parser.main".to_string()))
    );
}
