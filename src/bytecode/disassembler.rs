//! Bytecode disassembler for debugging.

use std::fmt::Write;

use crate::bytecode::chunk::Chunk;
use crate::bytecode::instruction::OpCode;

/// Disassemble a whole chunk into human-readable output.
pub fn disassemble_chunk(chunk: &Chunk, name: &str) -> String {
    let mut output = String::new();
    writeln!(&mut output, "== {} ==", name).unwrap();

    let mut offset = 0;
    while offset < chunk.code.len() {
        offset = disassemble_instruction(chunk, offset, &mut output);
    }

    output
}

/// Disassemble a single instruction, returning the next offset.
pub fn disassemble_instruction(chunk: &Chunk, offset: usize, output: &mut String) -> usize {
    write!(output, "{:04} ", offset).unwrap();

    // Print the line number, or | if unchanged from the previous byte.
    let line = chunk.get_line(offset);
    if offset > 0 && line == chunk.get_line(offset - 1) {
        write!(output, "   | ").unwrap();
    } else {
        write!(output, "{:4} ", line).unwrap();
    }

    let byte = chunk.code[offset];
    let opcode = match OpCode::from_u8(byte) {
        Some(op) => op,
        None => {
            writeln!(output, "Unknown opcode {}", byte).unwrap();
            return offset + 1;
        }
    };

    match opcode {
        // Constant-pool instructions: opcode + 1-byte index
        OpCode::Constant | OpCode::GetGlobal | OpCode::DefineGlobal | OpCode::SetGlobal => {
            let index = chunk.code[offset + 1] as usize;
            let name = format!("{:?}", opcode);
            match chunk.constants.get(index) {
                Some(constant) => {
                    writeln!(output, "{:<16} {:4} '{}'", name, index, constant).unwrap()
                }
                None => writeln!(output, "{:<16} {:4} <invalid>", name, index).unwrap(),
            }
            offset + 2
        }

        // Simple instructions (no operands)
        OpCode::Nil
        | OpCode::True
        | OpCode::False
        | OpCode::Pop
        | OpCode::Equal
        | OpCode::Greater
        | OpCode::Less
        | OpCode::Add
        | OpCode::Subtract
        | OpCode::Multiply
        | OpCode::Divide
        | OpCode::Not
        | OpCode::Negate
        | OpCode::Print
        | OpCode::Return => {
            writeln!(output, "{:?}", opcode).unwrap();
            offset + 1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::compiler::compile;
    use crate::value::Heap;

    #[test]
    fn test_disassemble_print_statement() {
        let mut heap = Heap::new();
        let chunk = compile("print 1 + 2;", &mut heap).expect("compile error");
        let output = disassemble_chunk(&chunk, "script");

        assert!(output.starts_with("== script ==\n"));
        assert!(output.contains("Constant"));
        assert!(output.contains("'1'"));
        assert!(output.contains("Add"));
        assert!(output.contains("Print"));
        assert!(output.contains("Return"));
    }

    #[test]
    fn test_line_continuation_marker() {
        let mut heap = Heap::new();
        let chunk = compile("print 1;", &mut heap).expect("compile error");
        let output = disassemble_chunk(&chunk, "script");

        // First instruction shows the line, the rest of the line shows |.
        assert!(output.contains("   1 "));
        assert!(output.contains("   | "));
    }

    #[test]
    fn test_offsets_cover_operands() {
        let mut heap = Heap::new();
        let chunk = compile("var x = 1;", &mut heap).expect("compile error");
        let mut output = String::new();
        let mut offset = 0;
        let mut steps = 0;
        while offset < chunk.code.len() {
            offset = disassemble_instruction(&chunk, offset, &mut output);
            steps += 1;
        }
        // Constant, DefineGlobal, Return.
        assert_eq!(steps, 3);
        assert_eq!(offset, chunk.code.len());
    }
}
