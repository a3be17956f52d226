//! Recursive-descent parser for the recipe DSL.
//!
//! Full grammar (abridged in `SPEC_FULL.md` §4.C, reproduced here in full):
//!
//! ```text
//! code_token   := (endf_line | for_loop | if_clause | section | stop_line)*
//! endf_line    := "[" ctrl_spec "/" body "]" KIND name?
//! ctrl_spec    := spec "," spec "," spec
//! spec         := "MAT" | "MF" | "MT" | NUMBER
//! for_loop     := "for" VARNAME "=" expr "to" expr ":" code_token* "endfor"
//! if_clause    := "if" disjunction ("[" "lookahead" "=" expr "]")? ":" code_token*
//!                 ("elif" disjunction ":" code_token*)* ("else" ":" code_token*)? "endif"
//! section      := "(" extvarname ")" code_token* "(" "/" extvarname ")"
//! stop_line    := "stop" "(" STRING ")"
//! disjunction  := conjunction ("or" conjunction)*
//! conjunction  := comparison ("and" comparison)*
//! comparison   := expr ("<"|"<="|"=="|"!="|">="|">") expr
//! expr         := term (("+"|"-") term)*
//! term         := unary (("*"|"/") unary)*
//! unary        := "-" unary | atom
//! atom         := (NUMBER | extvarname) "?"? | "(" expr ")"
//! extvarname   := VARNAME ("[" index ("," index)* "]")?
//! index        := VARNAME | NUMBER
//! ```
//!
//! `HEAD`/`CONT` bodies declare six fields; `DIR` four; `TAB1` four; `TAB2`
//! five; `TEXT` one (a bare `extvarname`); `SEND` none. `INTG` and `LIST`
//! have a second `"/"`-separated body segment (`II,JJ,NDIGIT / KIJ` and
//! `C1,C2,L1,L2,N1,N2 / list_body` respectively) — since the field count
//! alone cannot disambiguate a record's kind from its opening bracket, the
//! parser first scans ahead to the bracket's closing `]` to read the `KIND`
//! keyword before parsing the body it introduces.

use super::ast::*;
use super::lexer::{lex, Num as LexNum, Token};
use crate::error::EndfError;

pub fn parse_recipe(text: &str) -> Result<Ast, EndfError> {
    let tokens = lex(text)?;
    let mut parser = Parser { tokens, pos: 0 };
    let body = parser.parse_block(&[])?;
    if parser.pos != parser.tokens.len() {
        return Err(EndfError::Data);
    }
    Ok(Ast { body })
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_ident(&self) -> Option<&str> {
        match self.peek() {
            Some(Token::Ident(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    fn advance(&mut self) -> Result<Token, EndfError> {
        let tok = self.tokens.get(self.pos).cloned().ok_or(EndfError::Data)?;
        self.pos += 1;
        Ok(tok)
    }

    fn expect(&mut self, tok: &Token) -> Result<(), EndfError> {
        if self.peek() == Some(tok) {
            self.pos += 1;
            Ok(())
        } else {
            Err(EndfError::Data)
        }
    }

    fn expect_keyword(&mut self, kw: &str) -> Result<(), EndfError> {
        match self.advance()? {
            Token::Ident(s) if s.eq_ignore_ascii_case(kw) => Ok(()),
            _ => Err(EndfError::Data),
        }
    }

    fn at_keyword(&self, kw: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(s)) if s.eq_ignore_ascii_case(kw))
    }

    /// Parse statements until one of `stop_keywords` is the next token (not
    /// consumed) or the token stream ends.
    fn parse_block(&mut self, stop_keywords: &[&str]) -> Result<Vec<Instruction>, EndfError> {
        let mut body = Vec::new();
        loop {
            if self.pos >= self.tokens.len() {
                break;
            }
            if let Some(kw) = self.peek_ident() {
                if stop_keywords.iter().any(|s| kw.eq_ignore_ascii_case(s)) {
                    break;
                }
            }
            body.push(self.parse_statement()?);
        }
        Ok(body)
    }

    fn parse_statement(&mut self) -> Result<Instruction, EndfError> {
        match self.peek() {
            Some(Token::LBracket) => Ok(Instruction::Record(self.parse_record_line()?)),
            Some(Token::LParen) => self.parse_section(),
            Some(Token::Ident(kw)) if kw.eq_ignore_ascii_case("for") => self.parse_for_loop(),
            Some(Token::Ident(kw)) if kw.eq_ignore_ascii_case("if") => self.parse_if_clause(),
            Some(Token::Ident(kw)) if kw.eq_ignore_ascii_case("stop") => self.parse_stop(),
            _ => Err(EndfError::Data),
        }
    }

    fn parse_stop(&mut self) -> Result<Instruction, EndfError> {
        self.expect_keyword("stop")?;
        self.expect(&Token::LParen)?;
        let message = match self.advance()? {
            Token::StringLit(s) => s,
            _ => return Err(EndfError::Data),
        };
        self.expect(&Token::RParen)?;
        Ok(Instruction::Stop(message))
    }

    fn parse_for_loop(&mut self) -> Result<Instruction, EndfError> {
        self.expect_keyword("for")?;
        let var = self.parse_ident()?;
        self.expect(&Token::Assign)?;
        let start = self.parse_expr()?;
        self.expect_keyword("to")?;
        let stop = self.parse_expr()?;
        self.expect(&Token::Colon)?;
        let body = self.parse_block(&["endfor"])?;
        self.expect_keyword("endfor")?;
        Ok(Instruction::ForLoop { var, start, stop, body })
    }

    fn parse_if_clause(&mut self) -> Result<Instruction, EndfError> {
        self.expect_keyword("if")?;
        let mut branches = vec![self.parse_if_branch()?];
        let mut else_body = None;
        loop {
            if self.at_keyword("elif") {
                self.expect_keyword("elif")?;
                branches.push(self.parse_if_branch()?);
            } else if self.at_keyword("else") {
                self.expect_keyword("else")?;
                self.expect(&Token::Colon)?;
                else_body = Some(self.parse_block(&["endif"])?);
                break;
            } else {
                break;
            }
        }
        self.expect_keyword("endif")?;
        Ok(Instruction::IfClause { branches, else_body })
    }

    fn parse_if_branch(&mut self) -> Result<IfBranch, EndfError> {
        let condition = self.parse_disjunction()?;
        let lookahead = if self.peek() == Some(&Token::LBracket) {
            self.expect(&Token::LBracket)?;
            self.expect_keyword("lookahead")?;
            self.expect(&Token::Assign)?;
            let expr = self.parse_expr()?;
            self.expect(&Token::RBracket)?;
            Some(expr)
        } else {
            None
        };
        self.expect(&Token::Colon)?;
        let body = self.parse_block(&["elif", "else", "endif"])?;
        Ok(IfBranch { condition, lookahead, body })
    }

    fn parse_section(&mut self) -> Result<Instruction, EndfError> {
        self.expect(&Token::LParen)?;
        let open = self.parse_extvarname()?;
        self.expect(&Token::RParen)?;
        let body = self.parse_block_until_section_close()?;
        self.expect(&Token::LParen)?;
        self.expect(&Token::Slash)?;
        let close = self.parse_extvarname()?;
        self.expect(&Token::RParen)?;
        Ok(Instruction::Section { open, close, body })
    }

    /// Sections are the only construct whose terminator (`(/name)`) is not
    /// an `Ident` keyword, so `parse_block`'s keyword-based stop check
    /// cannot see it; scan for a top-level `(` immediately followed by `/`.
    fn parse_block_until_section_close(&mut self) -> Result<Vec<Instruction>, EndfError> {
        let mut body = Vec::new();
        loop {
            if self.pos >= self.tokens.len() {
                return Err(EndfError::Data);
            }
            if self.peek() == Some(&Token::LParen) && self.tokens.get(self.pos + 1) == Some(&Token::Slash) {
                break;
            }
            body.push(self.parse_statement()?);
        }
        Ok(body)
    }

    fn parse_ident(&mut self) -> Result<String, EndfError> {
        match self.advance()? {
            Token::Ident(s) => Ok(s),
            _ => Err(EndfError::Data),
        }
    }

    fn parse_extvarname(&mut self) -> Result<ExtVarName, EndfError> {
        let name = self.parse_ident()?;
        let mut indices = Vec::new();
        if self.peek() == Some(&Token::LBracket) {
            self.expect(&Token::LBracket)?;
            loop {
                indices.push(self.parse_index_term()?);
                if self.peek() == Some(&Token::Comma) {
                    self.expect(&Token::Comma)?;
                } else {
                    break;
                }
            }
            self.expect(&Token::RBracket)?;
        }
        Ok(ExtVarName { name, indices })
    }

    fn parse_index_term(&mut self) -> Result<IndexTerm, EndfError> {
        match self.advance()? {
            Token::Ident(s) => Ok(IndexTerm::Var(s)),
            Token::Number(LexNum::Int(i)) => Ok(IndexTerm::Literal(i)),
            Token::Minus => match self.advance()? {
                Token::Number(LexNum::Int(i)) => Ok(IndexTerm::Literal(-i)),
                _ => Err(EndfError::Data),
            },
            _ => Err(EndfError::Data),
        }
    }

    // ---- boolean expressions ----

    fn parse_disjunction(&mut self) -> Result<BoolExpr, EndfError> {
        let mut node = self.parse_conjunction()?;
        while self.at_keyword("or") {
            self.expect_keyword("or")?;
            let rhs = self.parse_conjunction()?;
            node = BoolExpr::Or(Box::new(node), Box::new(rhs));
        }
        Ok(node)
    }

    fn parse_conjunction(&mut self) -> Result<BoolExpr, EndfError> {
        let mut node = self.parse_comparison()?;
        while self.at_keyword("and") {
            self.expect_keyword("and")?;
            let rhs = self.parse_comparison()?;
            node = BoolExpr::And(Box::new(node), Box::new(rhs));
        }
        Ok(node)
    }

    fn parse_comparison(&mut self) -> Result<BoolExpr, EndfError> {
        let lhs = self.parse_expr()?;
        let op = match self.peek() {
            Some(Token::Lt) => CmpOp::Lt,
            Some(Token::Le) => CmpOp::Le,
            Some(Token::Eq) => CmpOp::Eq,
            Some(Token::Ne) => CmpOp::Ne,
            Some(Token::Ge) => CmpOp::Ge,
            Some(Token::Gt) => CmpOp::Gt,
            _ => return Err(EndfError::Data),
        };
        self.pos += 1;
        let rhs = self.parse_expr()?;
        Ok(BoolExpr::Cmp(op, lhs, rhs))
    }

    // ---- arithmetic expressions ----
    //
    // `/` doubles as both the division operator and the structural
    // separator between a record line's `ctrl_spec`, head fields, and
    // (for LIST/INTG) second body segment. Bracketed field lists
    // (`parse_expr_list`, and INTG's `ii`/`jj`/`ndigit`) therefore parse
    // with division disabled, so a trailing `/` is always read as the next
    // segment's separator rather than greedily consumed as an operator.
    // Every other expression context (loop bounds, `if` conditions,
    // `list_loop` ranges, values inside an already-separated LIST body) is
    // never followed by a structural `/` and allows it.

    fn parse_expr(&mut self) -> Result<Expr, EndfError> {
        self.parse_expr_ex(true)
    }

    fn parse_expr_no_div(&mut self) -> Result<Expr, EndfError> {
        self.parse_expr_ex(false)
    }

    fn parse_expr_ex(&mut self, allow_div: bool) -> Result<Expr, EndfError> {
        let mut node = self.parse_term_ex(allow_div)?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    node = Expr::Add(Box::new(node), Box::new(self.parse_term_ex(allow_div)?));
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    node = Expr::Sub(Box::new(node), Box::new(self.parse_term_ex(allow_div)?));
                }
                _ => break,
            }
        }
        Ok(node)
    }

    fn parse_term_ex(&mut self, allow_div: bool) -> Result<Expr, EndfError> {
        let mut node = self.parse_unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    node = Expr::Mul(Box::new(node), Box::new(self.parse_unary()?));
                }
                Some(Token::Slash) if allow_div => {
                    self.pos += 1;
                    node = Expr::Div(Box::new(node), Box::new(self.parse_unary()?));
                }
                _ => break,
            }
        }
        Ok(node)
    }

    fn parse_unary(&mut self) -> Result<Expr, EndfError> {
        if self.peek() == Some(&Token::Minus) {
            self.pos += 1;
            return Ok(Expr::Neg(Box::new(self.parse_unary()?)));
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> Result<Expr, EndfError> {
        if self.peek() == Some(&Token::LParen) {
            self.pos += 1;
            let inner = self.parse_expr()?;
            self.expect(&Token::RParen)?;
            return Ok(inner);
        }
        let base = match self.peek() {
            Some(Token::Number(_)) => match self.advance()? {
                Token::Number(LexNum::Int(i)) => Expr::Lit(Num::Int(i)),
                Token::Number(LexNum::Float(f)) => Expr::Lit(Num::Float(f)),
                _ => unreachable!(),
            },
            Some(Token::Ident(_)) => Expr::Var(self.parse_extvarname()?),
            _ => return Err(EndfError::Data),
        };
        if self.peek() == Some(&Token::Question) {
            self.pos += 1;
            Ok(Expr::Desired(Box::new(base)))
        } else {
            Ok(base)
        }
    }

    /// `expr`, but requires the result to be a bare `extvarname` (used for
    /// `TEXT`'s `HL` field and `INTG`'s `KIJ` field, which name a slot to
    /// bind rather than compute a value).
    fn parse_bare_varname(&mut self) -> Result<ExtVarName, EndfError> {
        match self.parse_expr()? {
            Expr::Var(ev) => Ok(ev),
            Expr::Desired(inner) => match *inner {
                Expr::Var(ev) => Ok(ev),
                _ => Err(EndfError::Data),
            },
            _ => Err(EndfError::Data),
        }
    }

    // ---- record lines ----

    fn parse_ctrl_spec(&mut self) -> Result<CtrlSpec, EndfError> {
        let mat = self.parse_ctrl_field("MAT")?;
        self.expect(&Token::Comma)?;
        let mf = self.parse_ctrl_field("MF")?;
        self.expect(&Token::Comma)?;
        let mt = self.parse_ctrl_field("MT")?;
        Ok(CtrlSpec { mat, mf, mt })
    }

    fn parse_ctrl_field(&mut self, placeholder: &str) -> Result<CtrlField, EndfError> {
        match self.advance()? {
            Token::Ident(s) if s.eq_ignore_ascii_case(placeholder) => Ok(CtrlField::Section),
            Token::Number(LexNum::Int(i)) => Ok(CtrlField::Literal(i)),
            Token::Minus => match self.advance()? {
                Token::Number(LexNum::Int(i)) => Ok(CtrlField::Literal(-i)),
                _ => Err(EndfError::Data),
            },
            _ => Err(EndfError::Data),
        }
    }

    fn parse_expr_list(&mut self, count: usize) -> Result<Vec<Expr>, EndfError> {
        let mut out = Vec::with_capacity(count);
        for i in 0..count {
            out.push(self.parse_expr_no_div()?);
            if i + 1 < count {
                self.expect(&Token::Comma)?;
            }
        }
        Ok(out)
    }

    /// Find the `]` closing the bracket whose content starts at `self.pos`
    /// and the `KIND` keyword immediately following it, without consuming
    /// anything.
    fn peek_kind(&self) -> Result<(usize, String), EndfError> {
        let mut depth = 0i32;
        let mut i = self.pos;
        loop {
            match self.tokens.get(i).ok_or(EndfError::Data)? {
                Token::LBrace => depth += 1,
                Token::RBrace => depth -= 1,
                Token::RBracket if depth == 0 => {
                    match self.tokens.get(i + 1) {
                        Some(Token::Ident(kind)) => return Ok((i, kind.clone())),
                        _ => return Err(EndfError::Data),
                    }
                }
                _ => {}
            }
            i += 1;
        }
    }

    fn parse_record_line(&mut self) -> Result<RecordLine, EndfError> {
        self.expect(&Token::LBracket)?;
        let (close_idx, kind) = self.peek_kind()?;
        let ctrl = self.parse_ctrl_spec()?;
        self.expect(&Token::Slash)?;
        let record = match kind.to_ascii_uppercase().as_str() {
            "HEAD" => {
                let fields = self.parse_expr_list(6)?;
                RecordLine::Head { ctrl, fields: fields.try_into().unwrap() }
            }
            "CONT" => {
                let fields = self.parse_expr_list(6)?;
                RecordLine::Cont { ctrl, fields: fields.try_into().unwrap() }
            }
            "DIR" => {
                let fields = self.parse_expr_list(4)?;
                RecordLine::Dir { ctrl, fields: fields.try_into().unwrap() }
            }
            "TAB1" => {
                let fields = self.parse_expr_list(4)?;
                RecordLine::Tab1 { ctrl, fields: fields.try_into().unwrap(), name: None }
            }
            "TAB2" => {
                let fields = self.parse_expr_list(5)?;
                RecordLine::Tab2 { ctrl, fields: fields.try_into().unwrap(), name: None }
            }
            "TEXT" => {
                let hl = self.parse_bare_varname()?;
                RecordLine::Text { ctrl, hl }
            }
            "SEND" => RecordLine::Send { ctrl },
            "INTG" => {
                let ii = self.parse_expr_no_div()?;
                self.expect(&Token::Comma)?;
                let jj = self.parse_expr_no_div()?;
                self.expect(&Token::Comma)?;
                let ndigit = self.parse_expr_no_div()?;
                self.expect(&Token::Slash)?;
                let kij = self.parse_bare_varname()?;
                RecordLine::Intg { ctrl, ii, jj, ndigit, kij }
            }
            "LIST" => {
                let fields = self.parse_expr_list(6)?;
                self.expect(&Token::Slash)?;
                let body = self.parse_list_body()?;
                RecordLine::List { ctrl, fields: fields.try_into().unwrap(), body }
            }
            _ => return Err(EndfError::Data),
        };
        if self.pos != close_idx {
            return Err(EndfError::Data);
        }
        self.expect(&Token::RBracket)?;
        self.expect_keyword(&kind)?;
        let record = match record {
            RecordLine::Tab1 { ctrl, fields, .. } if self.peek() == Some(&Token::LParen) => {
                self.pos += 1;
                let name = self.parse_extvarname()?;
                self.expect(&Token::RParen)?;
                RecordLine::Tab1 { ctrl, fields, name: Some(name) }
            }
            RecordLine::Tab2 { ctrl, fields, .. } if self.peek() == Some(&Token::LParen) => {
                self.pos += 1;
                let name = self.parse_extvarname()?;
                self.expect(&Token::RParen)?;
                RecordLine::Tab2 { ctrl, fields, name: Some(name) }
            }
            other => other,
        };
        Ok(record)
    }

    fn parse_list_body(&mut self) -> Result<Vec<ListItem>, EndfError> {
        let mut items = Vec::new();
        loop {
            match self.peek() {
                Some(Token::RBracket) => break,
                Some(Token::Ident(kw)) if kw.eq_ignore_ascii_case("padline") => {
                    self.pos += 1;
                    items.push(ListItem::Padding);
                }
                Some(Token::LBrace) => {
                    self.pos += 1;
                    let body = self.parse_list_body()?;
                    self.expect(&Token::RBrace)?;
                    self.expect(&Token::LBrace)?;
                    let var = self.parse_ident()?;
                    self.expect(&Token::Assign)?;
                    let start = self.parse_expr()?;
                    self.expect_keyword("to")?;
                    let stop = self.parse_expr()?;
                    self.expect(&Token::RBrace)?;
                    items.push(ListItem::Loop { var, start, stop, body });
                }
                Some(_) => {
                    let expr = self.parse_expr()?;
                    items.push(ListItem::Value(expr));
                }
                None => return Err(EndfError::Data),
            }
        }
        Ok(items)
    }
}
