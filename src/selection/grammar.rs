//! Tokenizer and recursive-descent parser for the selection language.
//! The grammar is whitespace-insensitive outside quoted
//! literals; identifiers are ASCII alphanumerics (plus `_`).

use regex::Regex;

use crate::error::MolError;
use crate::pbc::Dims;

use super::ast::{ByKind, CmpOp, IntKw, IntRange, Kind, LogicalOp, Node, NumExpr, NumFactor, PbcSpec, StrKw, StrPattern, VecSource};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    QuotedStr(String),
    Float(f64),
    Integer(i64),
    LParen,
    RParen,
    Colon,
    Cmp(CmpOp),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Eof,
}

struct Lexer<'a> {
    chars: Vec<char>,
    pos: usize,
    source: &'a str,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Lexer<'a> {
        Lexer { chars: source.chars().collect(), pos: 0, source }
    }

    fn column(&self) -> usize {
        self.pos + 1
    }

    fn error(&self, message: &str) -> MolError {
        MolError::ParseError { column: self.column(), message: message.to_string() }
    }

    fn peek_char(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek_char();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek_char(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn next_token(&mut self) -> Result<Token, MolError> {
        self.skip_ws();
        let c = match self.peek_char() {
            None => return Ok(Token::Eof),
            Some(c) => c,
        };

        if c == '\'' || c == '"' {
            return self.lex_quoted(c);
        }
        if c.is_ascii_digit() || (c == '.' && self.chars.get(self.pos + 1).is_some_and(|n| n.is_ascii_digit())) {
            return self.lex_number();
        }
        if c.is_ascii_alphabetic() || c == '_' {
            return self.lex_ident();
        }

        self.bump();
        match c {
            '(' => Ok(Token::LParen),
            ')' => Ok(Token::RParen),
            ':' => Ok(Token::Colon),
            '+' => Ok(Token::Plus),
            '-' => Ok(Token::Minus),
            '*' => {
                if self.peek_char() == Some('*') {
                    self.bump();
                }
                Ok(Token::Caret)
            }
            '/' => Ok(Token::Slash),
            '^' => Ok(Token::Caret),
            '=' => {
                if self.peek_char() == Some('=') {
                    self.bump();
                }
                Ok(Token::Cmp(CmpOp::Eq))
            }
            '!' => {
                if self.bump() == Some('=') {
                    Ok(Token::Cmp(CmpOp::Ne))
                } else {
                    Err(self.error("expected '=' after '!'"))
                }
            }
            '<' => match self.peek_char() {
                Some('=') => {
                    self.bump();
                    Ok(Token::Cmp(CmpOp::Le))
                }
                Some('>') => {
                    self.bump();
                    Ok(Token::Cmp(CmpOp::Ne))
                }
                _ => Ok(Token::Cmp(CmpOp::Lt)),
            },
            '>' => {
                if self.peek_char() == Some('=') {
                    self.bump();
                    Ok(Token::Cmp(CmpOp::Ge))
                } else {
                    Ok(Token::Cmp(CmpOp::Gt))
                }
            }
            other => Err(self.error(&format!("unexpected character '{other}'"))),
        }
    }

    fn lex_quoted(&mut self, quote: char) -> Result<Token, MolError> {
        self.bump();
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if c == quote {
                break;
            }
            self.pos += 1;
        }
        if self.peek_char() != Some(quote) {
            return Err(self.error("unterminated quoted literal"));
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        self.bump();
        Ok(Token::QuotedStr(text))
    }

    fn lex_number(&mut self) -> Result<Token, MolError> {
        let start = self.pos;
        let mut is_float = false;
        while matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek_char() == Some('.') {
            is_float = true;
            self.pos += 1;
            while matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        if matches!(self.peek_char(), Some('e') | Some('E')) {
            is_float = true;
            self.pos += 1;
            if matches!(self.peek_char(), Some('+') | Some('-')) {
                self.pos += 1;
            }
            while matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        if is_float {
            text.parse::<f64>().map(Token::Float).map_err(|_| self.error("invalid float literal"))
        } else {
            text.parse::<i64>().map(Token::Integer).map_err(|_| self.error("invalid integer literal"))
        }
    }

    fn lex_ident(&mut self) -> Result<Token, MolError> {
        let start = self.pos;
        while matches!(self.peek_char(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        Ok(Token::Ident(text))
    }
}

pub struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    _source: &'a str,
}

impl<'a> Parser<'a> {
    pub fn parse(source: &'a str) -> Result<Node, MolError> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let tok = lexer.next_token()?;
            let done = tok == Token::Eof;
            tokens.push(tok);
            if done {
                break;
            }
        }
        let mut parser = Parser { tokens, pos: 0, _source: source };
        let node = parser.logical_expr()?;
        parser.expect_eof()?;
        Ok(node)
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn bump(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn error(&self, message: &str) -> MolError {
        MolError::ParseError { column: self.pos, message: message.to_string() }
    }

    fn expect_eof(&mut self) -> Result<(), MolError> {
        if *self.peek() == Token::Eof {
            Ok(())
        } else {
            Err(self.error("trailing tokens after selection"))
        }
    }

    fn ident_is(&self, word: &str) -> bool {
        matches!(self.peek(), Token::Ident(w) if w == word)
    }

    fn eat_ident(&mut self, word: &str) -> bool {
        if self.ident_is(word) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_ident(&mut self, word: &str) -> Result<(), MolError> {
        if self.eat_ident(word) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{word}'")))
        }
    }

    // LOGICAL_EXPR := OPERAND ( ('and'|'or') OPERAND )*
    fn logical_expr(&mut self) -> Result<Node, MolError> {
        let mut node = self.operand()?;
        loop {
            let op = if self.eat_ident("and") {
                LogicalOp::And
            } else if self.eat_ident("or") {
                LogicalOp::Or
            } else {
                break;
            };
            let rhs = self.operand()?;
            node = Node::new(Kind::Logical { op, left: Box::new(node), right: Box::new(rhs) });
        }
        Ok(node)
    }

    // OPERAND := ('not'|BY)? ( '(' LOGICAL_EXPR ')' | 'all' | NUM_COMPARISON
    //                        | KEYWORD_EXPR | WITHIN )
    fn operand(&mut self) -> Result<Node, MolError> {
        if self.eat_ident("not") {
            let child = self.operand()?;
            return Ok(Node::new(Kind::Not(Box::new(child))));
        }
        if let Some(by_kind) = self.try_by_prefix()? {
            let child = self.operand()?;
            return Ok(Node::new(Kind::By { kind: by_kind, child: Box::new(child) }));
        }
        self.primary_operand()
    }

    /// `by KIND` or `same KIND as`; both produce a `ByKind`.
    fn try_by_prefix(&mut self) -> Result<Option<ByKind>, MolError> {
        if self.eat_ident("by") {
            let kind = self.by_kind()?;
            return Ok(Some(kind));
        }
        if self.ident_is("same") {
            let checkpoint = self.pos;
            self.bump();
            if let Ok(kind) = self.by_kind() {
                if self.eat_ident("as") {
                    return Ok(Some(kind));
                }
            }
            self.pos = checkpoint;
        }
        Ok(None)
    }

    fn by_kind(&mut self) -> Result<ByKind, MolError> {
        if self.eat_ident("residue") {
            Ok(ByKind::Residue)
        } else if self.eat_ident("chain") {
            Ok(ByKind::Chain)
        } else if self.eat_ident("mol") {
            Ok(ByKind::Mol)
        } else {
            Err(self.error("expected 'residue', 'chain', or 'mol'"))
        }
    }

    fn primary_operand(&mut self) -> Result<Node, MolError> {
        if matches!(self.peek(), Token::LParen) {
            self.bump();
            let node = self.logical_expr()?;
            self.expect_rparen()?;
            return Ok(node);
        }
        if self.eat_ident("all") {
            return Ok(Node::new(Kind::All));
        }
        if self.ident_is("within") {
            return self.within_expr();
        }
        if let Some(str_kw) = self.peek_str_kw() {
            self.bump();
            return self.str_keyword_expr(str_kw);
        }
        if let Some(int_kw) = self.peek_int_kw() {
            self.bump();
            return self.int_keyword_expr(int_kw);
        }
        self.num_comparison()
    }

    fn expect_rparen(&mut self) -> Result<(), MolError> {
        if matches!(self.peek(), Token::RParen) {
            self.bump();
            Ok(())
        } else {
            Err(self.error("expected ')'"))
        }
    }

    fn peek_str_kw(&self) -> Option<StrKw> {
        match self.peek() {
            Token::Ident(w) => match w.as_str() {
                "name" => Some(StrKw::Name),
                "resname" => Some(StrKw::Resname),
                "tag" => Some(StrKw::Tag),
                "chain" => Some(StrKw::Chain),
                "type" => Some(StrKw::Type),
                _ => None,
            },
            _ => None,
        }
    }

    fn peek_int_kw(&self) -> Option<IntKw> {
        match self.peek() {
            Token::Ident(w) => match w.as_str() {
                "resindex" => Some(IntKw::Resindex),
                "index" => Some(IntKw::Index),
                "resid" => Some(IntKw::Resid),
                _ => None,
            },
            _ => None,
        }
    }

    fn str_keyword_expr(&mut self, keyword: StrKw) -> Result<Node, MolError> {
        let mut patterns = Vec::new();
        loop {
            match self.peek().clone() {
                Token::QuotedStr(text) => {
                    self.bump();
                    let anchored = format!("^(?:{text})$");
                    let re = Regex::new(&anchored).map_err(|e| self.error(&format!("invalid regex: {e}")))?;
                    patterns.push(StrPattern::Regex(re));
                }
                Token::Ident(word) if !is_boundary_keyword(&word) => {
                    self.bump();
                    patterns.push(StrPattern::Literal(word));
                }
                _ => break,
            }
        }
        if patterns.is_empty() {
            return Err(self.error("expected at least one name/string pattern"));
        }
        Ok(Node::new(Kind::StrKeyword { keyword, patterns }))
    }

    fn int_keyword_expr(&mut self, keyword: IntKw) -> Result<Node, MolError> {
        let mut values = Vec::new();
        loop {
            match self.peek().clone() {
                Token::Integer(lo) => {
                    self.bump();
                    if matches!(self.peek(), Token::Colon) {
                        self.bump();
                        match self.bump() {
                            Token::Integer(hi) => values.push(IntRange { lo, hi }),
                            _ => return Err(self.error("expected integer after ':'")),
                        }
                    } else {
                        values.push(IntRange::single(lo));
                    }
                }
                _ => break,
            }
        }
        if values.is_empty() {
            return Err(self.error("expected at least one integer or range"));
        }
        Ok(Node::new(Kind::IntKeyword { keyword, values }))
    }

    // WITHIN := 'within' FLOAT (PBC? SELF?|SELF? PBC?) 'of' OPERAND
    fn within_expr(&mut self) -> Result<Node, MolError> {
        self.expect_ident("within")?;
        let cutoff = self.take_float()?;
        let mut pbc = PbcSpec::default();
        let mut include_self = false;
        for _ in 0..2 {
            if let Some(spec) = self.try_pbc_spec()? {
                pbc = spec;
            } else if self.eat_ident("self") {
                include_self = true;
            } else if self.eat_ident("noself") {
                include_self = false;
            } else {
                break;
            }
        }
        self.expect_ident("of")?;
        let operand = self.operand()?;
        Ok(Node::new(Kind::Within { cutoff, pbc, include_self, operand: Box::new(operand) }))
    }

    /// `pbc DIMS?` or `nopbc`; `periodic` is preserved as an undocumented
    /// synonym of `pbc`.
    fn try_pbc_spec(&mut self) -> Result<Option<PbcSpec>, MolError> {
        if self.eat_ident("nopbc") {
            return Ok(Some(PbcSpec { enabled: false, dims: [true, true, true] }));
        }
        if self.eat_ident("pbc") || self.eat_ident("periodic") {
            let dims = self.try_dims().unwrap_or([true, true, true]);
            return Ok(Some(PbcSpec { enabled: true, dims }));
        }
        Ok(None)
    }

    fn try_dims(&mut self) -> Option<Dims> {
        if let Token::Ident(w) = self.peek() {
            if w.len() == 3 && w.chars().all(|c| matches!(c, '0' | '1' | 'y' | 'Y' | 'n' | 'N')) {
                let chars: Vec<char> = w.chars().collect();
                let dims = [
                    matches!(chars[0], '1' | 'y' | 'Y'),
                    matches!(chars[1], '1' | 'y' | 'Y'),
                    matches!(chars[2], '1' | 'y' | 'Y'),
                ];
                self.bump();
                return Some(dims);
            }
        }
        None
    }

    fn take_float(&mut self) -> Result<f64, MolError> {
        match self.bump() {
            Token::Float(v) => Ok(v),
            Token::Integer(v) => Ok(v as f64),
            _ => Err(self.error("expected a number")),
        }
    }

    // NUM_COMPARISON := NUM_EXPR CMP NUM_EXPR (CMP NUM_EXPR)?
    fn num_comparison(&mut self) -> Result<Node, MolError> {
        let mut terms = vec![self.num_expr()?];
        let mut ops = Vec::new();
        while let Token::Cmp(op) = self.peek().clone() {
            self.bump();
            ops.push(op);
            terms.push(self.num_expr()?);
            if ops.len() == 2 {
                break;
            }
        }
        if ops.is_empty() {
            return Err(self.error("expected a comparison operator"));
        }
        Ok(Node::new(Kind::Comparison { terms, ops }))
    }

    // NUM_EXPR := term (('+'|'-') term)*
    fn num_expr(&mut self) -> Result<NumExpr, MolError> {
        let mut node = self.term()?;
        loop {
            if matches!(self.peek(), Token::Plus) {
                self.bump();
                node = NumExpr::Add(Box::new(node), Box::new(self.term()?));
            } else if matches!(self.peek(), Token::Minus) {
                self.bump();
                node = NumExpr::Sub(Box::new(node), Box::new(self.term()?));
            } else {
                break;
            }
        }
        Ok(node)
    }

    // term := power (('*'|'/') power)*
    fn term(&mut self) -> Result<NumExpr, MolError> {
        let mut node = self.power()?;
        loop {
            if matches!(self.peek(), Token::Star) {
                self.bump();
                node = NumExpr::Mul(Box::new(node), Box::new(self.power()?));
            } else if matches!(self.peek(), Token::Slash) {
                self.bump();
                node = NumExpr::Div(Box::new(node), Box::new(self.power()?));
            } else {
                break;
            }
        }
        Ok(node)
    }

    // power := factor ('^' power)?      (right-associative)
    fn power(&mut self) -> Result<NumExpr, MolError> {
        let base = self.num_factor()?;
        if matches!(self.peek(), Token::Caret) {
            self.bump();
            let exp = self.power()?;
            return Ok(NumExpr::Pow(Box::new(base), Box::new(exp)));
        }
        Ok(base)
    }

    // NUM_FACTOR := '-'? ( '(' NUM_EXPR ')' | X | Y | Z | BETA | OCC
    //                     | RESINDEX | INDEX | RESID | DIST | MASS | CHARGE )
    //             | FLOAT
    fn num_factor(&mut self) -> Result<NumExpr, MolError> {
        if matches!(self.peek(), Token::Minus) {
            self.bump();
            return Ok(NumExpr::Neg(Box::new(self.num_factor()?)));
        }
        if matches!(self.peek(), Token::LParen) {
            self.bump();
            let inner = self.num_expr()?;
            self.expect_rparen()?;
            return Ok(inner);
        }
        match self.peek().clone() {
            Token::Float(v) => {
                self.bump();
                Ok(NumExpr::Factor(NumFactor::Float(v)))
            }
            Token::Integer(v) => {
                self.bump();
                Ok(NumExpr::Factor(NumFactor::Float(v as f64)))
            }
            Token::Ident(word) => self.num_keyword_factor(&word),
            _ => Err(self.error("expected a numeric factor")),
        }
    }

    fn num_keyword_factor(&mut self, word: &str) -> Result<NumExpr, MolError> {
        match word {
            "x" => {
                self.bump();
                Ok(NumExpr::Factor(NumFactor::X(self.try_vec_arg()?)))
            }
            "y" => {
                self.bump();
                Ok(NumExpr::Factor(NumFactor::Y(self.try_vec_arg()?)))
            }
            "z" => {
                self.bump();
                Ok(NumExpr::Factor(NumFactor::Z(self.try_vec_arg()?)))
            }
            "beta" => {
                self.bump();
                Ok(NumExpr::Factor(NumFactor::Beta))
            }
            "occupancy" | "occ" => {
                self.bump();
                Ok(NumExpr::Factor(NumFactor::Occupancy))
            }
            "resindex" => {
                self.bump();
                Ok(NumExpr::Factor(NumFactor::Resindex))
            }
            "index" => {
                self.bump();
                Ok(NumExpr::Factor(NumFactor::Index))
            }
            "resid" => {
                self.bump();
                Ok(NumExpr::Factor(NumFactor::Resid))
            }
            "mass" => {
                self.bump();
                Ok(NumExpr::Factor(NumFactor::Mass))
            }
            "charge" => {
                self.bump();
                Ok(NumExpr::Factor(NumFactor::Charge))
            }
            "dist" | "distance" => self.dist_factor(),
            _ => Err(self.error(&format!("unexpected token '{word}'"))),
        }
    }

    /// An optional `(VEC3)` argument following a bare `x`/`y`/`z` token.
    fn try_vec_arg(&mut self) -> Result<Option<VecSource>, MolError> {
        if matches!(self.peek(), Token::LParen) {
            self.bump();
            let v = self.vec_source()?;
            self.expect_rparen()?;
            return Ok(Some(v));
        }
        Ok(None)
    }

    // DIST := ('dist'|'distance') PBC? 'from'
    //         ( VEC3 | 'vector' (...) | 'plane' (...) )
    fn dist_factor(&mut self) -> Result<NumExpr, MolError> {
        self.bump(); // 'dist' | 'distance'
        let pbc = self.try_pbc_spec()?.unwrap_or_default();
        self.expect_ident("from")?;
        if self.eat_ident("vector") {
            let (point, dir) = if self.eat_ident("from") {
                let p = self.vec_source()?;
                self.expect_ident("to")?;
                let q = self.vec_source()?;
                (p, q)
            } else if self.eat_ident("point") {
                let p = self.vec_source()?;
                self.expect_ident("dir")?;
                let d = self.vec_source()?;
                (p, d)
            } else {
                return Err(self.error("expected 'from' or 'point' after 'vector'"));
            };
            return Ok(NumExpr::Factor(NumFactor::DistFromVector { point, dir, pbc }));
        }
        if self.eat_ident("plane") {
            self.expect_ident("point")?;
            let p = self.vec_source()?;
            if self.eat_ident("normal") {
                let n = self.vec_source()?;
                return Ok(NumExpr::Factor(NumFactor::DistFromPlane { point: p, normal: n, pbc }));
            }
            let q = self.vec_source()?;
            let r = self.vec_source()?;
            let normal = VecSource::PlaneNormal { p: Box::new(p.clone()), q: Box::new(q), r: Box::new(r) };
            return Ok(NumExpr::Factor(NumFactor::DistFromPlane { point: p, normal, pbc }));
        }
        let point = self.vec_source()?;
        Ok(NumExpr::Factor(NumFactor::DistFromPoint { point, pbc }))
    }

    /// `VEC3 := FLOAT FLOAT FLOAT | 'index' INTEGER | ('com'|'cog') PBC? 'of' OPERAND`
    fn vec_source(&mut self) -> Result<VecSource, MolError> {
        if self.eat_ident("index") {
            match self.bump() {
                Token::Integer(i) if i >= 0 => return Ok(VecSource::AtomIndex(i as usize)),
                _ => return Err(self.error("expected a non-negative integer after 'index'")),
            }
        }
        if self.ident_is("com") || self.ident_is("cog") {
            let mass_weighted = self.eat_ident("com");
            if !mass_weighted {
                self.expect_ident("cog")?;
            }
            let pbc = self.try_pbc_spec()?.unwrap_or_default();
            self.expect_ident("of")?;
            let operand = self.operand()?;
            return Ok(VecSource::CenterOf { operand: Box::new(operand), mass_weighted, pbc });
        }
        let x = self.take_float()?;
        let y = self.take_float()?;
        let z = self.take_float()?;
        Ok(VecSource::Literal([x, y, z]))
    }
}

fn is_boundary_keyword(word: &str) -> bool {
    matches!(word, "and" | "or")
}
