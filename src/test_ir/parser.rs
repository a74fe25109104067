//! TIR (Test IR) parser implementation.

use super::{RegType, TestFunction, TirParseError};
use crate::core::instruction::{MachineInstr, MemOperand, Opcode, Operand, VirtReg};

pub fn parse_ir(text: &str) -> Result<TestFunction, TirParseError> {
    Parser::new(text).parse()
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
    line: u32,
    func: TestFunction,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            line: 1,
            func: TestFunction::new(),
        }
    }

    fn parse(mut self) -> Result<TestFunction, TirParseError> {
        loop {
            self.skip_whitespace(true);
            if self.is_eof() {
                break;
            }
            let mi = self.parse_instruction()?;
            self.expect_line_end()?;
            self.func.push(mi);
        }
        Ok(self.func)
    }

    fn error(&self, message: impl Into<String>) -> TirParseError {
        TirParseError {
            line: self.line,
            message: message.into(),
        }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn current_char(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            if ch == '\n' {
                self.line += 1;
            }
            self.pos += ch.len_utf8();
        }
    }

    fn skip_whitespace(&mut self, skip_newlines: bool) {
        while let Some(ch) = self.current_char() {
            if ch == ';' {
                // Comment runs to the end of the line
                while !matches!(self.current_char(), None | Some('\n')) {
                    self.advance();
                }
            } else if ch.is_whitespace() {
                if ch == '\n' && !skip_newlines {
                    break;
                }
                self.advance();
            } else {
                break;
            }
        }
    }

    fn at_line_end(&mut self) -> bool {
        self.skip_whitespace(false);
        matches!(self.current_char(), None | Some('\n'))
    }

    fn expect_line_end(&mut self) -> Result<(), TirParseError> {
        if self.at_line_end() {
            Ok(())
        } else {
            Err(self.error(format!(
                "expected end of line but found {:?}",
                self.current_char()
            )))
        }
    }

    fn try_read(&mut self, s: &str) -> bool {
        self.skip_whitespace(false);
        if self.text[self.pos..].starts_with(s) {
            for _ in s.chars() {
                self.advance();
            }
            true
        } else {
            false
        }
    }

    fn expect(&mut self, s: &str) -> Result<(), TirParseError> {
        if self.try_read(s) {
            Ok(())
        } else {
            Err(self.error(format!(
                "expected '{s}' but found {:?}",
                self.current_char()
            )))
        }
    }

    fn read_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.current_char().is_some_and(&pred) {
            self.advance();
        }
        &self.text[start..self.pos]
    }

    fn read_identifier(&mut self) -> Result<&'a str, TirParseError> {
        self.skip_whitespace(false);
        let ident = self.read_while(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '.');
        if ident.is_empty() {
            return Err(self.error(format!(
                "expected identifier but found {:?}",
                self.current_char()
            )));
        }
        Ok(ident)
    }

    fn parse_instruction(&mut self) -> Result<MachineInstr, TirParseError> {
        let mut operands = Vec::new();
        let mut num_defs = 0;

        self.skip_whitespace(false);
        if self.current_char() == Some('%') {
            loop {
                operands.push(Operand::Reg(self.parse_reg()?));
                num_defs += 1;
                if !self.try_read(",") {
                    break;
                }
            }
            self.expect("=")?;
        }

        let name = self.read_identifier()?;
        let opcode =
            Opcode::from_name(name).ok_or_else(|| self.error(format!("unknown opcode '{name}'")))?;

        if !self.at_line_end() && !self.text[self.pos..].starts_with("::") {
            loop {
                operands.push(self.parse_operand()?);
                if !self.try_read(",") {
                    break;
                }
            }
        }

        let mut mi = MachineInstr::new(opcode, operands).with_defs(num_defs);
        while self.try_read("::") {
            let mmo = match self.read_identifier()? {
                "uniform" => MemOperand::uniform(),
                "divergent" => MemOperand::divergent(),
                other => return Err(self.error(format!("unknown memory operand '{other}'"))),
            };
            mi = mi.with_mem_operand(mmo);
        }
        self.check_shape(&mi)?;
        Ok(mi)
    }

    /// Reject instructions bank selection cannot map.
    fn check_shape(&self, mi: &MachineInstr) -> Result<(), TirParseError> {
        let (num_defs, reg_operands): (usize, &[usize]) = match mi.opcode() {
            Opcode::Constant => (1, &[0]),
            Opcode::Load => (1, &[0, 1]),
            Opcode::Store => (0, &[0, 1]),
            _ => return Ok(()),
        };
        let name = mi.opcode().name();
        if mi.num_defs() != num_defs {
            return Err(self.error(format!(
                "{name} expects {num_defs} def(s), found {}",
                mi.num_defs()
            )));
        }
        for &idx in reg_operands {
            if idx >= mi.num_operands() || !mi.operand(idx).is_reg() {
                return Err(self.error(format!("{name} operand {idx} must be a register")));
            }
        }
        Ok(())
    }

    fn parse_operand(&mut self) -> Result<Operand, TirParseError> {
        self.skip_whitespace(false);
        match self.current_char() {
            Some('%') => Ok(Operand::Reg(self.parse_reg()?)),
            Some('@') => {
                self.advance();
                Ok(Operand::Symbol(self.read_identifier()?.to_string()))
            }
            Some(ch) if ch == '-' || ch.is_ascii_digit() => self.parse_imm(),
            other => Err(self.error(format!("expected operand but found {other:?}"))),
        }
    }

    fn parse_imm(&mut self) -> Result<Operand, TirParseError> {
        let start = self.pos;
        if self.current_char() == Some('-') {
            self.advance();
        }
        let digits = self.read_while(|ch| ch.is_ascii_alphanumeric());
        let text = &self.text[start..self.pos];
        let value = match digits.strip_prefix("0x") {
            Some(hex) => i64::from_str_radix(hex, 16).map(|v| if text.starts_with('-') { -v } else { v }),
            None => text.parse::<i64>(),
        };
        value
            .map(Operand::Imm)
            .map_err(|_| self.error(format!("invalid immediate '{text}'")))
    }

    fn parse_reg(&mut self) -> Result<VirtReg, TirParseError> {
        self.expect("%")?;
        let digits = self.read_while(|ch| ch.is_ascii_digit());
        let reg = digits
            .parse()
            .map(VirtReg)
            .map_err(|_| self.error(format!("invalid register number '{digits}'")))?;

        if self.current_char() == Some(':') && !self.text[self.pos..].starts_with("::") {
            self.advance();
            let name = self.read_identifier()?;
            let ty = RegType::parse(name)
                .ok_or_else(|| self.error(format!("unknown register type '{name}'")))?;
            if !self.func.declare(reg, ty) {
                return Err(self.error(format!("conflicting type '{ty}' for {reg}")));
            }
        }
        Ok(reg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::register_bank::RegisterClass;

    #[test]
    fn parses_defs_uses_and_mem_operands() {
        let func = parse_ir(
            "; uniform load\n\
             %0:p64 = COPY %9:sreg_64\n\
             %1:s32 = G_LOAD %0 :: uniform\n\
             \n\
             G_STORE %1, %0 :: divergent   ; trailing comment\n",
        )
        .unwrap();

        assert_eq!(func.instrs().len(), 3);
        let load = &func.instrs()[1];
        assert_eq!(load.opcode(), Opcode::Load);
        assert_eq!(load.num_defs(), 1);
        assert_eq!(load.operands(), &[Operand::Reg(VirtReg(1)), Operand::Reg(VirtReg(0))]);
        assert_eq!(load.mem_operands(), &[MemOperand::uniform()]);

        let store = &func.instrs()[2];
        assert_eq!(store.num_defs(), 0);
        assert_eq!(store.mem_operands(), &[MemOperand::divergent()]);

        assert_eq!(func.reg_type(VirtReg(9)), Some(RegType::Class(RegisterClass::SREG_64)));
        assert_eq!(func.reg_type(VirtReg(1)), Some(RegType::Scalar(32)));
    }

    #[test]
    fn parses_immediates_and_symbols() {
        let func = parse_ir("%3:p64 = G_GEP %0:p64, -16, 0x20, @table\n").unwrap();
        let gep = &func.instrs()[0];
        assert_eq!(gep.operand(2), &Operand::Imm(-16));
        assert_eq!(gep.operand(3), &Operand::Imm(32));
        assert_eq!(gep.operand(4), &Operand::Symbol("table".to_string()));
    }

    #[test]
    fn print_round_trips() {
        let text = "%0:p64 = COPY %9:sreg_64\n\
                    %1:s32 = G_LOAD %0 :: uniform\n\
                    %2:s32 = G_CONSTANT 42\n\
                    G_STORE %1, %0 :: divergent\n";
        let func = parse_ir(text).unwrap();
        assert_eq!(func.print(), text);
        assert_eq!(parse_ir(&func.print()).unwrap(), func);
    }

    #[test]
    fn reports_errors_with_line_numbers() {
        let err = parse_ir("%0:s32 = G_CONSTANT 1\n%1:s32 = G_FROB %0\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("unknown opcode 'G_FROB'"), "{err}");

        let err = parse_ir("%0:s32 = COPY %1:q7\n").unwrap_err();
        assert!(err.message.contains("unknown register type 'q7'"), "{err}");

        let err = parse_ir("%0:s32 = COPY %0:s64\n").unwrap_err();
        assert!(err.message.contains("conflicting type"), "{err}");

        let err = parse_ir("%0:s32 = G_LOAD %1 :: sometimes\n").unwrap_err();
        assert_eq!(err.to_string(), "line 1: unknown memory operand 'sometimes'");
    }

    #[test]
    fn rejects_unmappable_shapes() {
        let err = parse_ir("G_CONSTANT 7\n").unwrap_err();
        assert_eq!(err.to_string(), "line 1: G_CONSTANT expects 1 def(s), found 0");

        let err = parse_ir("%0:s32 = G_CONSTANT 1\nG_STORE %0\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("G_STORE operand 1 must be a register"), "{err}");

        let err = parse_ir("G_STORE %0:s32, @table\n").unwrap_err();
        assert!(err.message.contains("operand 1 must be a register"), "{err}");

        let err = parse_ir("G_LOAD %0:p64 :: uniform\n").unwrap_err();
        assert!(err.message.contains("G_LOAD expects 1 def(s)"), "{err}");

        // Opcodes handled by the fallback accept any shape.
        assert!(parse_ir("G_INTRINSIC 5\n").is_ok());
    }
}
