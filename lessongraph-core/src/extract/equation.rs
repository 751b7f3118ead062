//! Office Math (OMML) to LaTeX conversion.
//!
//! A structural tree walk: every math construct maps to one template and its
//! arguments are converted recursively. Constructs without a template fall
//! back to their visible characters and are reported by name. The converter
//! holds no state between calls.

use crate::xml::XmlElement;

#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedEquation {
    pub latex: String,
    /// Local names of constructs that were converted as plain text.
    pub fallbacks: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EquationConverter;

impl EquationConverter {
    pub fn new() -> Self {
        Self
    }

    /// Convert an `m:oMath` or `m:oMathPara` element.
    pub fn convert(&self, math: &XmlElement) -> ConvertedEquation {
        let mut walk = Walk::default();
        let latex = if math.is("oMathPara") {
            let lines: Vec<String> = math
                .children_named("oMath")
                .map(|m| walk.expr(m))
                .filter(|line| !line.trim().is_empty())
                .collect();
            if lines.len() > 1 {
                aligned(lines.iter().map(|line| align_row(line, false)).collect())
            } else {
                lines.into_iter().next().unwrap_or_default()
            }
        } else {
            walk.expr(math)
        };
        ConvertedEquation {
            latex: latex.trim().to_string(),
            fallbacks: walk.fallbacks,
        }
    }
}

#[derive(Default)]
struct Walk {
    fallbacks: Vec<String>,
}

impl Walk {
    /// Concatenate the converted children of a container element.
    fn expr(&mut self, container: &XmlElement) -> String {
        let mut buf = LatexBuf::default();
        for child in container.elements() {
            buf.push(&self.element(child));
        }
        buf.finish()
    }

    fn arg(&mut self, parent: &XmlElement, name: &str) -> String {
        parent
            .child(name)
            .map(|e| self.expr(e))
            .unwrap_or_default()
    }

    fn element(&mut self, el: &XmlElement) -> String {
        match el.local_name() {
            "r" => run_text(el),
            "f" => self.fraction(el),
            "sSup" => {
                let base = self.arg(el, "e");
                let sup = self.arg(el, "sup");
                format!("{}^{}", base_group(&base), script_group(&sup))
            }
            "sSub" => {
                let base = self.arg(el, "e");
                let sub = self.subscript(el);
                format!("{}_{}", base_group(&base), script_group(&sub))
            }
            "sSubSup" => {
                let base = self.arg(el, "e");
                let sub = self.arg(el, "sub");
                let sup = self.arg(el, "sup");
                format!(
                    "{}_{}^{}",
                    base_group(&base),
                    script_group(&sub),
                    script_group(&sup)
                )
            }
            "sPre" => {
                let sub = self.arg(el, "sub");
                let sup = self.arg(el, "sup");
                let base = self.arg(el, "e");
                format!("{{}}_{}^{}{}", script_group(&sub), script_group(&sup), base)
            }
            "rad" => self.radical(el),
            "func" => self.function(el),
            "limLow" => {
                let base = function_word(&self.arg(el, "e"));
                let lim = self.arg(el, "lim");
                format!("{}_{}", base_group(&base), script_group(&lim))
            }
            "limUpp" => {
                let base = function_word(&self.arg(el, "e"));
                let lim = self.arg(el, "lim");
                format!("{}^{}", base_group(&base), script_group(&lim))
            }
            "eqArr" => {
                let rows: Vec<String> = el
                    .children_named("e")
                    .map(|row| self.expr(row))
                    .filter(|row| !row.trim().is_empty())
                    .collect();
                if rows.is_empty() {
                    String::new()
                } else {
                    aligned(rows.iter().map(|row| align_row(row, true)).collect())
                }
            }
            "nary" => self.nary(el),
            "d" => self.delimiter(el),
            "acc" => self.accent(el),
            "bar" => {
                let body = self.arg(el, "e");
                match prop_val(el, "barPr", "pos") {
                    Some("top") => format!("\\overline{{{body}}}"),
                    _ => format!("\\underline{{{body}}}"),
                }
            }
            "groupChr" => self.group_char(el),
            "m" => {
                let rows: Vec<String> = el
                    .children_named("mr")
                    .map(|row| {
                        row.children_named("e")
                            .map(|cell| self.expr(cell))
                            .collect::<Vec<_>>()
                            .join(" & ")
                    })
                    .collect();
                format!("\\begin{{matrix}}{}\\end{{matrix}}", rows.join(" \\\\ "))
            }
            "borderBox" => format!("\\boxed{{{}}}", self.arg(el, "e")),
            "box" | "phant" => self.arg(el, "e"),
            "oMath" | "e" | "num" | "den" | "sub" | "sup" | "deg" | "fName" | "lim" => {
                self.expr(el)
            }
            name if name.ends_with("Pr") => String::new(),
            // Bookmarks, proofing and revision marks carry no math.
            "bookmarkStart" | "bookmarkEnd" | "proofErr" | "del" => String::new(),
            name => {
                self.fallbacks.push(name.to_string());
                let mut buf = LatexBuf::default();
                for ch in el.visible_text().chars() {
                    buf.push(&map_char(ch));
                }
                buf.finish()
            }
        }
    }

    fn fraction(&mut self, el: &XmlElement) -> String {
        let num = self.arg(el, "num");
        let den = self.arg(el, "den");
        match prop_val(el, "fPr", "type") {
            Some("lin") => format!("{}/{}", base_group(&num), base_group(&den)),
            Some("noBar") => format!("\\genfrac{{}}{{}}{{0pt}}{{}}{{{num}}}{{{den}}}"),
            _ => format!("\\frac{{{num}}}{{{den}}}"),
        }
    }

    /// Subscript argument; stacked rows become `\substack`.
    fn subscript(&mut self, el: &XmlElement) -> String {
        let Some(sub) = el.child("sub") else {
            return String::new();
        };
        if let Some(array) = sub.child("eqArr") {
            let rows: Vec<String> = array
                .children_named("e")
                .map(|row| self.expr(row))
                .filter(|row| !row.is_empty())
                .collect();
            if !rows.is_empty() {
                return format!("\\substack{{{}}}", rows.join(" \\\\ "));
            }
        }
        self.expr(sub)
    }

    fn radical(&mut self, el: &XmlElement) -> String {
        let body = self.arg(el, "e");
        let hidden = prop_flag(el, "radPr", "degHide");
        let degree = self.arg(el, "deg");
        if hidden || degree.trim().is_empty() {
            format!("\\sqrt{{{body}}}")
        } else {
            format!("\\sqrt[{degree}]{{{body}}}")
        }
    }

    fn function(&mut self, el: &XmlElement) -> String {
        let name_el = el.child("fName");
        let plain = name_el.map(|n| n.visible_text()).unwrap_or_default();
        let plain = plain.trim();
        let simple_name = name_el
            .map(|n| n.elements().all(|c| c.is("r") || c.local_name().ends_with("Pr")))
            .unwrap_or(true);

        let name = if simple_name && KNOWN_FUNCTIONS.contains(&plain) {
            format!("\\{plain}")
        } else if simple_name && !plain.is_empty() && plain.chars().all(|c| c.is_ascii_alphabetic()) {
            format!("\\operatorname{{{plain}}}")
        } else {
            self.arg(el, "fName")
        };

        let argument = self.arg(el, "e");
        if argument.starts_with(|c: char| c.is_ascii_alphanumeric()) {
            format!("{name} {argument}")
        } else {
            format!("{name}{argument}")
        }
    }

    fn nary(&mut self, el: &XmlElement) -> String {
        // OMML defaults the operator to an integral when `m:chr` is absent.
        let chr = prop_val(el, "naryPr", "chr").unwrap_or("∫");
        let operator = nary_operator(chr);
        let mut out = operator;
        if !prop_flag(el, "naryPr", "subHide") {
            let sub = self.arg(el, "sub");
            if !sub.trim().is_empty() {
                out.push_str(&format!("_{}", script_group(&sub)));
            }
        }
        if !prop_flag(el, "naryPr", "supHide") {
            let sup = self.arg(el, "sup");
            if !sup.trim().is_empty() {
                out.push_str(&format!("^{}", script_group(&sup)));
            }
        }
        let body = self.arg(el, "e");
        if body.is_empty() {
            out
        } else {
            format!("{out} {body}")
        }
    }

    fn delimiter(&mut self, el: &XmlElement) -> String {
        let begin = prop_val(el, "dPr", "begChr").unwrap_or("(");
        let end = prop_val(el, "dPr", "endChr").unwrap_or(")");
        let sep = prop_val(el, "dPr", "sepChr").unwrap_or("|");
        let parts: Vec<String> = el.children_named("e").map(|e| self.expr(e)).collect();
        let separator = match sep {
            "|" => "\\mid ".to_string(),
            other => delimiter_symbol(other),
        };
        format!(
            "\\left{}{}\\right{}",
            delimiter_symbol(begin),
            parts.join(&separator),
            delimiter_symbol(end)
        )
    }

    fn accent(&mut self, el: &XmlElement) -> String {
        let chr = prop_val(el, "accPr", "chr").unwrap_or("\u{0302}");
        let body = self.arg(el, "e");
        match accent_command(chr) {
            Some(command) => format!("{command}{{{body}}}"),
            None => format!("\\overset{{{}}}{{{body}}}", map_char_str(chr)),
        }
    }

    fn group_char(&mut self, el: &XmlElement) -> String {
        let chr = prop_val(el, "groupChrPr", "chr").unwrap_or("\u{23DF}");
        let top = prop_val(el, "groupChrPr", "pos") == Some("top");
        let body = self.arg(el, "e");
        match chr {
            "\u{23DF}" => format!("\\underbrace{{{body}}}"),
            "\u{23DE}" => format!("\\overbrace{{{body}}}"),
            other if top => format!("\\overset{{{}}}{{{body}}}", map_char_str(other)),
            other => format!("\\underset{{{}}}{{{body}}}", map_char_str(other)),
        }
    }
}

const KNOWN_FUNCTIONS: &[&str] = &[
    "sin", "cos", "tan", "cot", "sec", "csc", "arcsin", "arccos", "arctan", "sinh", "cosh",
    "tanh", "coth", "log", "ln", "lg", "exp", "lim", "max", "min", "sup", "inf", "det", "gcd",
    "arg", "deg", "dim", "ker", "hom", "Pr",
];

/// Plain `lim`, `max` and friends used as a limit base become commands.
fn function_word(base: &str) -> String {
    if KNOWN_FUNCTIONS.contains(&base.trim()) {
        format!("\\{}", base.trim())
    } else {
        base.to_string()
    }
}

fn run_text(run: &XmlElement) -> String {
    let normal_text = run
        .child("rPr")
        .and_then(|rpr| rpr.child("nor"))
        .map(|nor| !matches!(nor.attr("val"), Some("0") | Some("off") | Some("false")))
        .unwrap_or(false);
    let text: String = run.children_named("t").map(|t| t.own_text()).collect();
    if normal_text && !text.trim().is_empty() {
        return format!("\\text{{{}}}", escape_text(&text));
    }
    let mut buf = LatexBuf::default();
    for ch in text.chars() {
        buf.push(&map_char(ch));
    }
    buf.finish()
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '{' | '}' | '%' | '#' | '&' | '$' => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out
}

fn prop<'a>(el: &'a XmlElement, props: &str, name: &str) -> Option<&'a XmlElement> {
    el.child(props).and_then(|p| p.child(name))
}

fn prop_val<'a>(el: &'a XmlElement, props: &str, name: &str) -> Option<&'a str> {
    prop(el, props, name).and_then(|p| p.attr("val"))
}

/// On/off property: present without `val`, or with `1`/`on`/`true`.
fn prop_flag(el: &XmlElement, props: &str, name: &str) -> bool {
    match prop(el, props, name) {
        Some(p) => matches!(p.attr("val"), None | Some("1") | Some("on") | Some("true")),
        None => false,
    }
}

fn aligned(rows: Vec<String>) -> String {
    format!("\\begin{{aligned}}\n{}\n\\end{{aligned}}", rows.join(" \\\\\n"))
}

/// Insert the alignment point before the first `=`. Rows of an equation array
/// without `=` are aligned at their start.
fn align_row(row: &str, align_bare: bool) -> String {
    let row = row.trim();
    if row.starts_with('=') {
        format!("&{row}")
    } else if row.contains('=') {
        row.replacen('=', "&=", 1)
    } else if align_bare {
        format!("&{row}")
    } else {
        row.to_string()
    }
}

fn is_control_word(s: &str) -> bool {
    let Some(rest) = s.strip_prefix('\\') else {
        return false;
    };
    !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphabetic())
}

/// Group an operand so a following script binds to all of it.
fn base_group(s: &str) -> String {
    let s = s.trim();
    if s.chars().count() == 1 || is_control_word(s) {
        s.to_string()
    } else {
        format!("{{{s}}}")
    }
}

fn script_group(s: &str) -> String {
    base_group(s)
}

fn nary_operator(chr: &str) -> String {
    match chr {
        "∑" => "\\sum",
        "∏" => "\\prod",
        "∐" => "\\coprod",
        "∫" => "\\int",
        "∬" => "\\iint",
        "∭" => "\\iiint",
        "∮" => "\\oint",
        "∯" => "\\oiint",
        "∰" => "\\oiiint",
        "⋃" => "\\bigcup",
        "⋂" => "\\bigcap",
        "⋁" => "\\bigvee",
        "⋀" => "\\bigwedge",
        "⨁" => "\\bigoplus",
        "⨂" => "\\bigotimes",
        "⨀" => "\\bigodot",
        "⨄" => "\\biguplus",
        other => return map_char_str(other),
    }
    .to_string()
}

fn delimiter_symbol(chr: &str) -> String {
    match chr {
        "" => ".",
        "{" => "\\{",
        "}" => "\\}",
        "‖" => "\\|",
        "⟨" | "〈" => "\\langle",
        "⟩" | "〉" => "\\rangle",
        "⌊" => "\\lfloor",
        "⌋" => "\\rfloor",
        "⌈" => "\\lceil",
        "⌉" => "\\rceil",
        other => return other.to_string(),
    }
    .to_string()
}

fn accent_command(chr: &str) -> Option<&'static str> {
    Some(match chr {
        "\u{0302}" | "^" => "\\hat",
        "\u{0303}" | "~" => "\\tilde",
        "\u{0304}" | "\u{0305}" | "¯" => "\\bar",
        "\u{0307}" | "˙" => "\\dot",
        "\u{0308}" | "¨" => "\\ddot",
        "\u{20D7}" | "→" => "\\vec",
        "\u{0301}" | "´" => "\\acute",
        "\u{0300}" | "`" => "\\grave",
        "\u{0306}" | "˘" => "\\breve",
        "\u{030C}" | "ˇ" => "\\check",
        "\u{20D6}" => "\\overleftarrow",
        "\u{20E1}" => "\\overleftrightarrow",
        _ => return None,
    })
}

fn map_char_str(s: &str) -> String {
    let mut buf = LatexBuf::default();
    for ch in s.chars() {
        buf.push(&map_char(ch));
    }
    buf.finish()
}

/// LaTeX for one character of math text.
fn map_char(ch: char) -> String {
    let mapped = match ch {
        'α' => "\\alpha",
        'β' => "\\beta",
        'γ' => "\\gamma",
        'δ' => "\\delta",
        'ε' => "\\varepsilon",
        'ϵ' => "\\epsilon",
        'ζ' => "\\zeta",
        'η' => "\\eta",
        'θ' => "\\theta",
        'ϑ' => "\\vartheta",
        'ι' => "\\iota",
        'κ' => "\\kappa",
        'λ' => "\\lambda",
        'μ' | '\u{00B5}' => "\\mu",
        'ν' => "\\nu",
        'ξ' => "\\xi",
        'π' => "\\pi",
        'ρ' => "\\rho",
        'σ' => "\\sigma",
        'ς' => "\\varsigma",
        'τ' => "\\tau",
        'υ' => "\\upsilon",
        'φ' => "\\varphi",
        'ϕ' => "\\phi",
        'χ' => "\\chi",
        'ψ' => "\\psi",
        'ω' => "\\omega",
        'Γ' => "\\Gamma",
        'Δ' => "\\Delta",
        'Θ' => "\\Theta",
        'Λ' => "\\Lambda",
        'Ξ' => "\\Xi",
        'Π' => "\\Pi",
        'Σ' => "\\Sigma",
        'Υ' => "\\Upsilon",
        'Φ' => "\\Phi",
        'Ψ' => "\\Psi",
        'Ω' | '\u{2126}' => "\\Omega",
        '×' => "\\times",
        '÷' => "\\div",
        '±' => "\\pm",
        '∓' => "\\mp",
        '·' | '⋅' => "\\cdot",
        '∗' => "\\ast",
        '−' => "-",
        '≤' => "\\leq",
        '≥' => "\\geq",
        '≠' => "\\neq",
        '≈' => "\\approx",
        '≡' => "\\equiv",
        '≅' => "\\cong",
        '∼' => "\\sim",
        '∝' => "\\propto",
        '≪' => "\\ll",
        '≫' => "\\gg",
        '∞' => "\\infty",
        '∂' => "\\partial",
        '∇' => "\\nabla",
        '→' => "\\rightarrow",
        '←' => "\\leftarrow",
        '↔' => "\\leftrightarrow",
        '⇒' => "\\Rightarrow",
        '⇐' => "\\Leftarrow",
        '⇔' => "\\Leftrightarrow",
        '↑' => "\\uparrow",
        '↓' => "\\downarrow",
        '⇌' => "\\rightleftharpoons",
        '∈' => "\\in",
        '∉' => "\\notin",
        '∋' => "\\ni",
        '⊂' => "\\subset",
        '⊃' => "\\supset",
        '⊆' => "\\subseteq",
        '⊇' => "\\supseteq",
        '∪' => "\\cup",
        '∩' => "\\cap",
        '∅' => "\\emptyset",
        '∀' => "\\forall",
        '∃' => "\\exists",
        '¬' => "\\neg",
        '∧' => "\\wedge",
        '∨' => "\\vee",
        '°' => "^{\\circ}",
        '′' => "'",
        '″' => "''",
        '∠' => "\\angle",
        '△' => "\\triangle",
        '∴' => "\\therefore",
        '∵' => "\\because",
        '⊥' => "\\perp",
        '∥' => "\\parallel",
        '…' => "\\ldots",
        '⋯' => "\\cdots",
        '⋮' => "\\vdots",
        'ℏ' => "\\hbar",
        'ℓ' => "\\ell",
        '\u{00A0}' => " ",
        '{' => "\\{",
        '}' => "\\}",
        '%' => "\\%",
        '#' => "\\#",
        '&' => "\\&",
        '$' => "\\$",
        _ => return ch.to_string(),
    };
    mapped.to_string()
}

/// String builder that keeps a control word from swallowing a following letter.
#[derive(Default)]
struct LatexBuf {
    out: String,
}

impl LatexBuf {
    fn push(&mut self, piece: &str) {
        if piece.is_empty() {
            return;
        }
        let starts_with_letter = piece
            .chars()
            .next()
            .map(|c| c.is_ascii_alphabetic())
            .unwrap_or(false);
        if starts_with_letter && self.ends_with_control_word() {
            self.out.push(' ');
        }
        self.out.push_str(piece);
    }

    fn ends_with_control_word(&self) -> bool {
        let letters = self
            .out
            .chars()
            .rev()
            .take_while(|c| c.is_ascii_alphabetic())
            .count();
        if letters == 0 {
            return false;
        }
        // Letters are ASCII so the char count is also the byte length.
        let before = &self.out[..self.out.len() - letters];
        before.ends_with('\\') && !before.ends_with("\\\\")
    }

    fn finish(self) -> String {
        self.out
    }
}
