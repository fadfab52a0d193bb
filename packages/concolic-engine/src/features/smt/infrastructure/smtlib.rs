//! SMT-LIB v2 printing of `SmtExpr` and parsing of solver answers

use super::ast::{Conversion, ExprKind, SmtExpr, Sort};
use crate::features::smt::domain::{mask, Opcode, RawValue, SmtError};

/// Print a sort as SMT-LIB2
pub fn sort_to_smtlib(sort: &Sort) -> String {
    sort.to_string()
}

/// Plain symbols print as-is, anything else is `|quoted|`
pub fn symbol(name: &str) -> String {
    let simple = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "~!@$%^&*_-+=<>.?/".contains(c));
    if simple {
        name.to_string()
    } else {
        format!("|{}|", name.replace('|', "_").replace('\\', "_"))
    }
}

fn bound_name(binder: u32, index: u32) -> String {
    format!("?b{}_{}", binder, index)
}

fn fp_params(sort: &Sort) -> (u32, u32) {
    match sort {
        Sort::Float => (8, 24),
        _ => (11, 53),
    }
}

fn fp_literal(bits: u64, sort: &Sort) -> String {
    match sort {
        Sort::Float => {
            let raw = (f64::from_bits(bits) as f32).to_bits();
            format!(
                "(fp #b{} #b{:08b} #b{:023b})",
                raw >> 31,
                (raw >> 23) & 0xFF,
                raw & 0x7F_FFFF
            )
        }
        _ => format!(
            "(fp #b{} #b{:011b} #b{:052b})",
            bits >> 63,
            (bits >> 52) & 0x7FF,
            bits & 0xF_FFFF_FFFF_FFFF
        ),
    }
}

fn binders(binder: u32, sorts: &[Sort]) -> String {
    sorts
        .iter()
        .enumerate()
        .map(|(i, s)| format!("({} {})", bound_name(binder, i as u32), s))
        .collect::<Vec<_>>()
        .join(" ")
}

fn bv_op(op: Opcode) -> &'static str {
    match op {
        Opcode::Eq | Opcode::Iff => "=",
        Opcode::Neq => "distinct",
        Opcode::Add => "bvadd",
        Opcode::Sub => "bvsub",
        Opcode::Mul => "bvmul",
        Opcode::Divide => "bvsdiv",
        Opcode::Mod => "bvsrem",
        Opcode::Gt => "bvsgt",
        Opcode::Ge => "bvsge",
        Opcode::Lt => "bvslt",
        Opcode::Le => "bvsle",
        Opcode::Shl => "bvshl",
        Opcode::Shr => "bvlshr",
        Opcode::Ashr => "bvashr",
        Opcode::And => "bvand",
        Opcode::Or => "bvor",
        Opcode::Xor => "bvxor",
        Opcode::Implies => "=>",
        Opcode::Concat => "concat",
    }
}

fn binary_to_smtlib(op: Opcode, lhs: &SmtExpr, rhs: &SmtExpr) -> String {
    let (l, r) = (to_smtlib(lhs), to_smtlib(rhs));
    match lhs.sort() {
        Sort::Float | Sort::Double => match op {
            Opcode::Eq => format!("(fp.eq {} {})", l, r),
            Opcode::Neq => format!("(not (fp.eq {} {}))", l, r),
            Opcode::Add => format!("(fp.add RNE {} {})", l, r),
            Opcode::Sub => format!("(fp.sub RNE {} {})", l, r),
            Opcode::Mul => format!("(fp.mul RNE {} {})", l, r),
            Opcode::Divide => format!("(fp.div RNE {} {})", l, r),
            Opcode::Mod => format!("(fp.rem {} {})", l, r),
            Opcode::Gt => format!("(fp.gt {} {})", l, r),
            Opcode::Ge => format!("(fp.geq {} {})", l, r),
            Opcode::Lt => format!("(fp.lt {} {})", l, r),
            Opcode::Le => format!("(fp.leq {} {})", l, r),
            other => format!("({} {} {})", bv_op(other), l, r),
        },
        Sort::Bool => match op {
            Opcode::And => format!("(and {} {})", l, r),
            Opcode::Or => format!("(or {} {})", l, r),
            Opcode::Xor => format!("(xor {} {})", l, r),
            other => format!("({} {} {})", bv_op(other), l, r),
        },
        Sort::Str if op == Opcode::Concat => format!("(str.++ {} {})", l, r),
        _ => format!("({} {} {})", bv_op(op), l, r),
    }
}

/// Print an expression as SMT-LIB2
pub fn to_smtlib(expr: &SmtExpr) -> String {
    match expr.kind() {
        ExprKind::Var(name) => symbol(name),
        ExprKind::Bound { binder, index } => bound_name(*binder, *index),
        ExprKind::BoolConst(b) => b.to_string(),
        ExprKind::BvConst(bits) => match expr.sort() {
            Sort::BitVec(w) => format!("(_ bv{} {})", bits & mask(*w), w),
            _ => bits.to_string(),
        },
        ExprKind::FpConst(bits) => fp_literal(*bits, expr.sort()),
        ExprKind::StrConst(s) => format!("\"{}\"", s.replace('"', "\"\"")),
        ExprKind::ConstArray(value) => {
            format!("((as const {}) {})", expr.sort(), to_smtlib(value))
        }
        ExprKind::Not(inner) => format!("(not {})", to_smtlib(inner)),
        ExprKind::And(parts) => {
            let inner: Vec<String> = parts.iter().map(to_smtlib).collect();
            format!("(and {})", inner.join(" "))
        }
        ExprKind::Or(parts) => {
            let inner: Vec<String> = parts.iter().map(to_smtlib).collect();
            format!("(or {})", inner.join(" "))
        }
        ExprKind::Binary(op, lhs, rhs) => binary_to_smtlib(*op, lhs, rhs),
        ExprKind::Neg(inner) => match inner.sort() {
            Sort::Float | Sort::Double => format!("(fp.neg {})", to_smtlib(inner)),
            _ => format!("(bvneg {})", to_smtlib(inner)),
        },
        ExprKind::Ite(c, t, e) => format!(
            "(ite {} {} {})",
            to_smtlib(c),
            to_smtlib(t),
            to_smtlib(e)
        ),
        ExprKind::Extract { high, low, arg } => {
            format!("((_ extract {} {}) {})", high, low, to_smtlib(arg))
        }
        ExprKind::Convert(conv, arg) => match conv {
            Conversion::SignExtend(n) => format!("((_ sign_extend {}) {})", n, to_smtlib(arg)),
            Conversion::BvToFp | Conversion::FpToFp => {
                let (e, s) = fp_params(expr.sort());
                format!("((_ to_fp {} {}) RNE {})", e, s, to_smtlib(arg))
            }
            Conversion::FpToBv => {
                let width = match expr.sort() {
                    Sort::BitVec(w) => *w,
                    _ => 32,
                };
                format!("((_ fp.to_sbv {}) RTZ {})", width, to_smtlib(arg))
            }
        },
        ExprKind::Select(a, i) => format!("(select {} {})", to_smtlib(a), to_smtlib(i)),
        ExprKind::Store(a, i, v) => format!(
            "(store {} {} {})",
            to_smtlib(a),
            to_smtlib(i),
            to_smtlib(v)
        ),
        ExprKind::Quantifier {
            universal,
            binder,
            sorts,
            body,
            patterns,
        } => {
            let q = if *universal { "forall" } else { "exists" };
            let body = if patterns.is_empty() {
                to_smtlib(body)
            } else {
                let pats: Vec<String> = patterns
                    .iter()
                    .map(|p| {
                        let terms: Vec<String> = p.iter().map(to_smtlib).collect();
                        format!(":pattern ({})", terms.join(" "))
                    })
                    .collect();
                format!("(! {} {})", to_smtlib(body), pats.join(" "))
            };
            format!("({} ({}) {})", q, binders(*binder, sorts), body)
        }
        ExprKind::Lambda {
            binder,
            sorts,
            body,
        } => format!("(lambda ({}) {})", binders(*binder, sorts), to_smtlib(body)),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Responses
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum Sexp {
    Atom(String),
    Str(String),
    List(Vec<Sexp>),
}

impl Sexp {
    fn atom(&self) -> Option<&str> {
        match self {
            Sexp::Atom(a) => Some(a),
            _ => None,
        }
    }

    fn list(&self) -> Option<&[Sexp]> {
        match self {
            Sexp::List(items) => Some(items),
            _ => None,
        }
    }
}

/// Net parenthesis depth of `text`, ignoring string literals and quoted
/// symbols. A response is complete once the running total returns to 0.
pub fn paren_balance(text: &str) -> i64 {
    let mut depth = 0i64;
    let mut in_str = false;
    let mut in_quote = false;
    for c in text.chars() {
        match c {
            '"' if !in_quote => in_str = !in_str,
            '|' if !in_str => in_quote = !in_quote,
            '(' if !in_str && !in_quote => depth += 1,
            ')' if !in_str && !in_quote => depth -= 1,
            _ => {}
        }
    }
    depth
}

/// Parse every s-expression in `text`
pub fn parse_sexps(text: &str) -> Result<Vec<Sexp>, SmtError> {
    let chars: Vec<char> = text.chars().collect();
    let mut pos = 0;
    let mut out = Vec::new();
    loop {
        skip_ws(&chars, &mut pos);
        if pos >= chars.len() {
            return Ok(out);
        }
        out.push(parse_one(&chars, &mut pos)?);
    }
}

fn skip_ws(chars: &[char], pos: &mut usize) {
    while *pos < chars.len() {
        if chars[*pos].is_whitespace() {
            *pos += 1;
        } else if chars[*pos] == ';' {
            while *pos < chars.len() && chars[*pos] != '\n' {
                *pos += 1;
            }
        } else {
            break;
        }
    }
}

fn parse_one(chars: &[char], pos: &mut usize) -> Result<Sexp, SmtError> {
    match chars[*pos] {
        '(' => {
            *pos += 1;
            let mut items = Vec::new();
            loop {
                skip_ws(chars, pos);
                match chars.get(*pos) {
                    None => return Err(SmtError::parse("unbalanced parentheses")),
                    Some(')') => {
                        *pos += 1;
                        return Ok(Sexp::List(items));
                    }
                    Some(_) => items.push(parse_one(chars, pos)?),
                }
            }
        }
        ')' => Err(SmtError::parse("unexpected ')'")),
        '"' => {
            *pos += 1;
            let mut s = String::new();
            loop {
                match chars.get(*pos) {
                    None => return Err(SmtError::parse("unterminated string literal")),
                    Some('"') if chars.get(*pos + 1) == Some(&'"') => {
                        s.push('"');
                        *pos += 2;
                    }
                    Some('"') => {
                        *pos += 1;
                        return Ok(Sexp::Str(s));
                    }
                    Some(c) => {
                        s.push(*c);
                        *pos += 1;
                    }
                }
            }
        }
        '|' => {
            *pos += 1;
            let start = *pos;
            while *pos < chars.len() && chars[*pos] != '|' {
                *pos += 1;
            }
            if *pos >= chars.len() {
                return Err(SmtError::parse("unterminated quoted symbol"));
            }
            let name: String = chars[start..*pos].iter().collect();
            *pos += 1;
            Ok(Sexp::Atom(name))
        }
        _ => {
            let start = *pos;
            while *pos < chars.len()
                && !chars[*pos].is_whitespace()
                && !matches!(chars[*pos], '(' | ')' | '"' | ';')
            {
                *pos += 1;
            }
            Ok(Sexp::Atom(chars[start..*pos].iter().collect()))
        }
    }
}

fn parse_bits(digits: &str, radix: u32) -> Option<u64> {
    u64::from_str_radix(digits, radix).ok()
}

fn parse_bv(sexp: &Sexp, width: u32) -> Option<u64> {
    if let Some(atom) = sexp.atom() {
        if let Some(hex) = atom.strip_prefix("#x") {
            return parse_bits(hex, 16).map(|b| b & mask(width));
        }
        if let Some(bin) = atom.strip_prefix("#b") {
            return parse_bits(bin, 2).map(|b| b & mask(width));
        }
        return None;
    }
    match sexp.list()? {
        [Sexp::Atom(u), Sexp::Atom(lit), Sexp::Atom(_)] if u == "_" => lit
            .strip_prefix("bv")
            .and_then(|d| d.parse::<u64>().ok())
            .map(|b| b & mask(width)),
        _ => None,
    }
}

fn parse_fp(sexp: &Sexp, sort: &Sort) -> Option<f64> {
    let items = sexp.list()?;
    let (exp_bits, sig_bits) = fp_params(sort);
    match items {
        [Sexp::Atom(fp), s, e, m] if fp == "fp" => {
            let s = parse_bv(s, 1)?;
            let e = parse_bv(e, exp_bits)?;
            let m = parse_bv(m, sig_bits - 1)?;
            Some(match sort {
                Sort::Float => {
                    let raw = ((s as u32) << 31) | ((e as u32) << 23) | (m as u32);
                    f32::from_bits(raw) as f64
                }
                _ => f64::from_bits((s << 63) | (e << 52) | m),
            })
        }
        [Sexp::Atom(u), Sexp::Atom(name), _, _] if u == "_" => match name.as_str() {
            "+zero" => Some(0.0),
            "-zero" => Some(-0.0),
            "+oo" => Some(f64::INFINITY),
            "-oo" => Some(f64::NEG_INFINITY),
            "NaN" => Some(f64::NAN),
            _ => None,
        },
        _ => None,
    }
}

/// Decode a model value of the given sort. Forms the decoder does not know
/// (`as-array`, `lambda`, `let`) give `None`.
pub fn parse_value(sexp: &Sexp, sort: &Sort) -> Option<RawValue> {
    match sort {
        Sort::Bool => match sexp.atom()? {
            "true" => Some(RawValue::Bool(true)),
            "false" => Some(RawValue::Bool(false)),
            _ => None,
        },
        Sort::BitVec(width) => parse_bv(sexp, *width).map(|bits| RawValue::BitVec {
            bits,
            width: *width,
        }),
        Sort::Float | Sort::Double => parse_fp(sexp, sort).map(RawValue::Float),
        Sort::Str => match sexp {
            Sexp::Str(s) => Some(RawValue::Str(s.clone())),
            _ => None,
        },
        Sort::Array(domain, range) => {
            let items = sexp.list()?;
            match items {
                // ((as const (Array D R)) v)
                [Sexp::List(head), value]
                    if head.first().and_then(Sexp::atom) == Some("as")
                        && head.get(1).and_then(Sexp::atom) == Some("const") =>
                {
                    Some(RawValue::Array {
                        entries: Vec::new(),
                        default: Box::new(parse_value(value, range)?),
                    })
                }
                [Sexp::Atom(store), base, index, value] if store == "store" => {
                    let RawValue::Array {
                        mut entries,
                        default,
                    } = parse_value(base, sort)?
                    else {
                        return None;
                    };
                    let index = parse_value(index, domain)?;
                    let value = parse_value(value, range)?;
                    entries.retain(|(k, _)| k != &index);
                    entries.push((index, value));
                    Some(RawValue::Array { entries, default })
                }
                _ => None,
            }
        }
    }
}

/// Decode a `(get-value (e1 e2 ...))` answer into one value per probe
pub fn parse_get_value(text: &str, sorts: &[Sort]) -> Result<Vec<Option<RawValue>>, SmtError> {
    let sexps = parse_sexps(text)?;
    let pairs = sexps
        .first()
        .and_then(Sexp::list)
        .ok_or_else(|| SmtError::parse(format!("expected value list, got `{}`", text.trim())))?;
    if pairs.len() != sorts.len() {
        return Err(SmtError::parse(format!(
            "expected {} values, got {}",
            sorts.len(),
            pairs.len()
        )));
    }
    Ok(pairs
        .iter()
        .zip(sorts)
        .map(|(pair, sort)| match pair.list() {
            Some([_, value]) => parse_value(value, sort),
            _ => None,
        })
        .collect())
}
