//! Recursive-descent parser for the Opal language.
//!
//! Grammar:
//! ```text
//! program   = sep* (statement sep+)* statement? EOF
//! statement = class | def | if | while | for | "break" | "continue"
//!           | "return" expr | "print" "(" expr ")" | NAME "=" expr | expr
//! class     = "class" NAME ("<" NAME)? sep block "end"
//! def       = "def" TYPE? NAME "(" params? ")" sep block "end"
//! if        = "if" expr "then"? block ("else" block)? "end"
//! while     = "while" expr block "end"
//! for       = "for" NAME "in" expr block "end"
//! expr      = arith (CMP arith)?
//! arith     = term (("+"|"-") term)*
//! term      = postfix (("*"|"/") postfix)*
//! postfix   = primary ("[" expr "]")*
//! primary   = INT | FLOAT | STRING | "true" | "false" | "-" (INT|FLOAT)
//!           | NAME "(" args? ")" | NAME "." NAME "(" args? ")" | NAME
//!           | "(" expr ")" | "[" (expr ("," expr)*)? "]"
//! ```

use crate::ast::{BinOperator, Block, Comparison, Funktion, Klass, Node, Param, Program, Value};
use crate::errors::{OpalError, Result};
use crate::lexer::{tokenize, unquote, SpannedToken, Token};

/// The class every other class inherits from when no parent is named.
pub const ROOT_CLASS: &str = "Object";

/// Recursive-descent parser over a pre-lexed token vector.
pub struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
    /// Nesting of blocks being parsed; the program block is depth 1.
    depth: usize,
    in_class: bool,
}

impl Parser {
    /// Create a new parser by lexing the full source up-front.
    pub fn new(source: &str) -> Result<Self> {
        Ok(Self { tokens: tokenize(source)?, pos: 0, depth: 0, in_class: false })
    }

    // ── helpers ──────────────────────────────────────────────────────

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|s| &s.token)
    }

    /// Line of the current token, or of the last one at EOF.
    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(1, |t| t.line)
    }

    fn error(&self, message: impl Into<String>) -> OpalError {
        OpalError::parser(self.line(), message)
    }

    fn advance(&mut self) -> Result<SpannedToken> {
        let item = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| self.error("unexpected end of input"))?;
        self.pos += 1;
        Ok(item)
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consume the next token and check it matches `expected`.
    fn expect(&mut self, expected: Token, what: &str) -> Result<SpannedToken> {
        match self.peek() {
            Some(tok) if *tok == expected => self.advance(),
            Some(_) => {
                let found = self.tokens[self.pos].lexeme.escape_default().to_string();
                Err(self.error(format!("expected {what}, found '{found}'")))
            }
            None => Err(self.error(format!("expected {what}, found end of input"))),
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String> {
        Ok(self.expect(Token::Ident, what)?.lexeme)
    }

    fn skip_newlines(&mut self) {
        while self.eat(&Token::Newline) {}
    }

    // ── statements ──────────────────────────────────────────────────

    /// Entry point: parse the entire source into a [`Program`].
    pub fn parse_program(&mut self) -> Result<Program> {
        let block = self.parse_block(&[])?;
        if let Some(tok) = self.tokens.get(self.pos) {
            return Err(self.error(format!("unexpected '{}'", tok.lexeme)));
        }
        Ok(Program::new(block))
    }

    /// Parse statements until one of `terminators` (left unconsumed) or EOF.
    fn parse_block(&mut self, terminators: &[Token]) -> Result<Block> {
        let mut statements = Vec::new();
        self.depth += 1;
        loop {
            self.skip_newlines();
            match self.peek() {
                None => break,
                Some(tok) if terminators.contains(tok) => break,
                Some(_) => {}
            }

            statements.push(self.parse_statement()?);

            match self.peek() {
                None | Some(Token::Newline) => {}
                Some(tok) if terminators.contains(tok) => {}
                Some(_) => return Err(self.error("expected a newline after statement")),
            }
        }
        self.depth -= 1;
        Ok(Block::new(statements))
    }

    fn parse_statement(&mut self) -> Result<Node> {
        if self.in_class && self.peek() != Some(&Token::Def) {
            return Err(self.error("only method definitions are allowed inside a class body"));
        }

        match self.peek() {
            Some(Token::Class) => self.parse_class().map(Node::Klass),
            Some(Token::Def) => self.parse_def().map(Node::Funktion),
            Some(Token::If) => self.parse_if(),
            Some(Token::While) => self.parse_while(),
            Some(Token::For) => self.parse_for(),
            Some(Token::Break) => {
                self.advance()?;
                Ok(Node::Break)
            }
            Some(Token::Continue) => {
                self.advance()?;
                Ok(Node::Continue)
            }
            Some(Token::Return) => {
                self.advance()?;
                Ok(Node::Return(Box::new(self.parse_expr()?)))
            }
            Some(Token::Print) => {
                self.advance()?;
                self.expect(Token::LParen, "'(' after print")?;
                let value = self.parse_expr()?;
                self.expect(Token::RParen, "')' to close print")?;
                Ok(Node::Print(Box::new(value)))
            }
            Some(Token::Ident) if self.peek_at(1) == Some(&Token::Assign) => {
                let name = self.advance()?.lexeme;
                self.advance()?; // consume '='
                Ok(Node::assign(name, self.parse_expr()?))
            }
            _ => self.parse_expr(),
        }
    }

    /// `class Name (< Parent)? ... end`
    fn parse_class(&mut self) -> Result<Klass> {
        if self.depth > 1 {
            return Err(self.error("classes can only be declared at the top level"));
        }
        self.advance()?; // consume 'class'
        let name = self.expect_ident("a class name")?;
        let parent = if self.eat(&Token::Lt) {
            Some(self.expect_ident("a parent class name after '<'")?)
        } else if name == ROOT_CLASS {
            None
        } else {
            Some(ROOT_CLASS.to_string())
        };

        self.in_class = true;
        let body = self.parse_block(&[Token::End]);
        self.in_class = false;
        let body = body?;
        self.expect(Token::End, "'end' to close class")?;

        let mut klass = Klass { name, body, parent };
        if !klass.has_constructor() {
            klass.body.statements.insert(0, Node::Funktion(Funktion::default_constructor()));
        }
        Ok(klass)
    }

    /// `def (Type)? name(params) ... end`
    fn parse_def(&mut self) -> Result<Funktion> {
        if !self.in_class {
            return Err(self.error("methods can only be defined inside a class"));
        }
        self.advance()?; // consume 'def'

        let declared_ret = if self.peek() == Some(&Token::Ident) && self.peek_at(1) == Some(&Token::Ident) {
            Some(self.advance()?.lexeme)
        } else {
            None
        };
        let name = self.expect_ident("a method name")?;

        self.expect(Token::LParen, "'(' after method name")?;
        let params = self.parse_params()?;
        self.expect(Token::RParen, "')' to close parameters")?;

        self.in_class = false;
        let body = self.parse_block(&[Token::End]);
        self.in_class = true;
        let body = body?;
        self.expect(Token::End, "'end' to close method")?;

        let ret_type = declared_ret.or_else(|| returned_literal_type(&body).map(str::to_string));
        Ok(Funktion { is_constructor: name == "init", name, params, body, ret_type })
    }

    fn parse_params(&mut self) -> Result<Vec<Param>> {
        let mut params = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            return Ok(params);
        }
        loop {
            let name = self.expect_ident("a parameter name")?;
            let type_name = if self.eat(&Token::DoubleColon) {
                Some(self.expect_ident("a parameter type after '::'")?)
            } else {
                None
            };
            params.push(Param { name, type_name });
            if !self.eat(&Token::Comma) {
                return Ok(params);
            }
        }
    }

    fn parse_if(&mut self) -> Result<Node> {
        self.advance()?; // consume 'if'
        let cond = self.parse_expr()?;
        self.eat(&Token::Then);
        let then_ = self.parse_block(&[Token::Else, Token::End])?;
        let else_ = if self.eat(&Token::Else) {
            Some(self.parse_block(&[Token::End])?)
        } else {
            None
        };
        self.expect(Token::End, "'end' to close if")?;
        Ok(Node::If { cond: Box::new(cond), then_, else_ })
    }

    fn parse_while(&mut self) -> Result<Node> {
        self.advance()?; // consume 'while'
        let cond = self.parse_expr()?;
        let body = self.parse_block(&[Token::End])?;
        self.expect(Token::End, "'end' to close while")?;
        Ok(Node::While { cond: Box::new(cond), body })
    }

    fn parse_for(&mut self) -> Result<Node> {
        self.advance()?; // consume 'for'
        let var = self.expect_ident("a loop variable")?;
        self.expect(Token::In, "'in' after loop variable")?;
        let iterable = self.parse_expr()?;
        let body = self.parse_block(&[Token::End])?;
        self.expect(Token::End, "'end' to close for")?;
        Ok(Node::For { var, iterable: Box::new(iterable), body })
    }

    // ── expressions ─────────────────────────────────────────────────

    fn parse_expr(&mut self) -> Result<Node> {
        let lhs = self.parse_arith()?;
        let cmp = match self.peek() {
            Some(Token::EqEq) => Comparison::Eq,
            Some(Token::NotEq) => Comparison::Neq,
            Some(Token::Gt) => Comparison::Gt,
            Some(Token::Gte) => Comparison::Gte,
            Some(Token::Lt) => Comparison::Lt,
            Some(Token::Lte) => Comparison::Lte,
            _ => return Ok(lhs),
        };
        self.advance()?;
        let rhs = self.parse_arith()?;
        Ok(Node::binary(BinOperator::Comparison(cmp), lhs, rhs))
    }

    fn parse_arith(&mut self) -> Result<Node> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOperator::Add,
                Some(Token::Minus) => BinOperator::Sub,
                _ => return Ok(lhs),
            };
            self.advance()?;
            let rhs = self.parse_term()?;
            lhs = Node::binary(op, lhs, rhs);
        }
    }

    fn parse_term(&mut self) -> Result<Node> {
        let mut lhs = self.parse_postfix()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOperator::Mul,
                Some(Token::Slash) => BinOperator::Div,
                _ => return Ok(lhs),
            };
            self.advance()?;
            let rhs = self.parse_postfix()?;
            lhs = Node::binary(op, lhs, rhs);
        }
    }

    fn parse_postfix(&mut self) -> Result<Node> {
        let mut node = self.parse_primary()?;
        while self.eat(&Token::LBracket) {
            let index = self.parse_expr()?;
            self.expect(Token::RBracket, "']' to close index")?;
            node = Node::IndexOf { list: Box::new(node), index: Box::new(index) };
        }
        Ok(node)
    }

    fn parse_primary(&mut self) -> Result<Node> {
        let tok = self.advance()?;
        match tok.token {
            Token::IntLit => self.int_literal(&tok.lexeme),
            Token::FloatLit => self.float_literal(&tok.lexeme),
            Token::Minus => {
                let lit = self.advance()?;
                match lit.token {
                    Token::IntLit => self.int_literal(&format!("-{}", lit.lexeme)),
                    Token::FloatLit => self.float_literal(&format!("-{}", lit.lexeme)),
                    _ => Err(self.error("'-' must be followed by a number")),
                }
            }
            Token::Str => Ok(Node::Value(Value::String(unquote(&tok.lexeme)))),
            Token::True => Ok(Node::Value(Value::Bool(true))),
            Token::False => Ok(Node::Value(Value::Bool(false))),
            Token::LParen => {
                let inner = self.parse_expr()?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            Token::LBracket => {
                let items = self.parse_args(Token::RBracket)?;
                self.expect(Token::RBracket, "']' to close list")?;
                Ok(Node::List(items))
            }
            Token::Ident => self.parse_name(tok.lexeme),
            _ => Err(self.error(format!("unexpected '{}'", tok.lexeme.escape_default()))),
        }
    }

    /// Instantiation, method call or plain variable load.
    fn parse_name(&mut self, name: String) -> Result<Node> {
        if self.eat(&Token::LParen) {
            let args = self.parse_args(Token::RParen)?;
            self.expect(Token::RParen, "')' to close arguments")?;
            return Ok(Node::Call { class_name: name, args });
        }

        if self.eat(&Token::Dot) {
            let method = self.expect_ident("a method name after '.'")?;
            self.expect(Token::LParen, "'(' after method name")?;
            let args = self.parse_args(Token::RParen)?;
            self.expect(Token::RParen, "')' to close arguments")?;
            return Ok(Node::MethodCall { instance: name, method, args });
        }

        Ok(Node::VarValue(name))
    }

    /// Comma separated expressions up to (not including) `close`.
    fn parse_args(&mut self, close: Token) -> Result<Vec<Node>> {
        let mut args = Vec::new();
        if self.peek() == Some(&close) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            if !self.eat(&Token::Comma) {
                return Ok(args);
            }
        }
    }

    fn int_literal(&self, text: &str) -> Result<Node> {
        text.parse::<i32>()
            .map(|v| Node::Value(Value::Integer(v)))
            .map_err(|_| self.error(format!("integer literal {text} does not fit in 32 bits")))
    }

    fn float_literal(&self, text: &str) -> Result<Node> {
        text.parse::<f64>()
            .map(|v| Node::Value(Value::Float(v)))
            .map_err(|_| self.error(format!("invalid float literal {text}")))
    }
}

/// Type name of the first literal returned anywhere in `block`.
fn returned_literal_type(block: &Block) -> Option<&'static str> {
    block.statements.iter().find_map(|stmt| match stmt {
        Node::Return(value) => match value.as_ref() {
            Node::Value(v) => Some(v.type_name()),
            _ => None,
        },
        Node::If { then_, else_, .. } => returned_literal_type(then_)
            .or_else(|| else_.as_ref().and_then(returned_literal_type)),
        Node::While { body, .. } | Node::For { body, .. } => returned_literal_type(body),
        _ => None,
    })
}

/// Parse a complete source text.
pub fn parse(source: &str) -> Result<Program> {
    Parser::new(source)?.parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Phase;

    fn dump(source: &str) -> String {
        parse(source).unwrap().dump()
    }

    #[test]
    fn parses_operator_precedence() {
        assert_eq!(dump("1 + 2 * 3"), "(Program\n  (Block\n  (+ 1 (* 2 3))))");
        assert_eq!(dump("(1 + 2) * 3"), "(Program\n  (Block\n  (* (+ 1 2) 3)))");
    }

    #[test]
    fn parses_negative_literals() {
        assert_eq!(dump("-5 - -1.5"), "(Program\n  (Block\n  (- -5 -1.5)))");
    }

    #[test]
    fn parses_assignment_and_instances() {
        assert!(dump("number = Integer()").contains("(= number Integer())"));
        assert!(dump("number = Integer(1)").contains("(= number Integer((Integer 1)))"));
    }

    #[test]
    fn parses_comparisons() {
        assert!(dump("print(2 >= 1)").contains("(Print (>= 2 1))"));
        assert!(dump("a != b").contains("(!= a b)"));
    }

    #[test]
    fn parses_single_line_if_else() {
        let out = dump("if false then print('A') else print('B') end");
        assert!(out.contains("If((Boolean false)) Then((Block\n  (Print (String A))))"));
        assert!(out.contains("Else((Block\n  (Print (String B))))"));
    }

    #[test]
    fn parses_while_with_break() {
        assert!(dump("while true\n  break\nend").contains("While((Boolean true)) (Block\n  Break)"));
    }

    #[test]
    fn parses_for_lists_and_indexing() {
        assert!(dump("for x in [1, 2]\nprint(x)\nend").contains("For((Var x) in [(Integer 1), (Integer 2)])"));
        assert!(dump("[1, 2][0]").contains("(position 0 [(Integer 1), (Integer 2)])"));
    }

    #[test]
    fn parses_method_calls() {
        assert!(dump("foo.bar(1)").contains("(foo.bar (Integer 1))"));
    }

    #[test]
    fn classes_default_to_object_parent() {
        let program = parse("class Object\nend\nclass Foo\nend\nclass Bar < Foo\nend").unwrap();
        let classes = program.classes();
        assert_eq!(classes[0].parent, None);
        assert_eq!(classes[1].parent.as_deref(), Some("Object"));
        assert_eq!(classes[2].parent.as_deref(), Some("Foo"));
    }

    #[test]
    fn synthesizes_a_first_init() {
        let program = parse("class Foo\n  def bar()\n  end\nend").unwrap();
        let klass = program.classes()[0];
        let names: Vec<&str> = klass.functions().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["init", "bar"]);
        assert!(klass.functions().next().unwrap().is_constructor);
    }

    #[test]
    fn keeps_explicit_init() {
        let program = parse("class Foo\n  def init(val::Cint32)\n  end\nend").unwrap();
        let klass = program.classes()[0];
        assert_eq!(klass.functions().count(), 1);
        assert_eq!(klass.functions().next().unwrap().params.len(), 1);
    }

    #[test]
    fn infers_return_type_from_literal() {
        let program = parse("class Integer\n  def do_it(val::Cint32)\n    return 15\n  end\nend").unwrap();
        assert!(program.dump().contains(
            "(Cint32 do_it(val::Cint32) (Block\n  (Return (Integer 15))))"
        ));
    }

    #[test]
    fn declared_return_type_wins() {
        let program = parse("class A\n  def Float f()\n    return 1\n  end\nend").unwrap();
        let f = program.classes()[0].functions().nth(1).unwrap();
        assert_eq!(f.ret_type.as_deref(), Some("Float"));
    }

    #[test]
    fn def_outside_class_is_an_error() {
        let err = parse("def foo()\nend").unwrap_err();
        assert_eq!(err.phase(), Phase::Parser);
        assert!(err.to_string().contains("inside a class"));
    }

    #[test]
    fn classes_must_be_top_level() {
        let err = parse("if true\n  class Foo\n  end\nend").unwrap_err();
        assert!(err.to_string().contains("top level"));
    }

    #[test]
    fn reports_the_failing_line() {
        let err = parse("a = 1\nb = (2 + \n").unwrap_err();
        assert!(err.to_string().starts_with("line 2:"));
    }

    #[test]
    fn requires_separators_between_statements() {
        assert!(parse("a = 1 b = 2").is_err());
    }
}
