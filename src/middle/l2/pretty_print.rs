use colored::Colorize;

use crate::middle::l2;

pub fn pretty_print_program(program: &l2::Program) {
    print!("{}", render_program(program));
}

pub fn render_program(program: &l2::Program) -> String {
    let mut output = String::new();

    output.push_str(&format!("{}\n", "main:".bright_red()));
    render_body(&mut output, &program.main);

    for (name, body) in &program.closures {
        output.push_str(&format!(
            "{} {}{}\n",
            "closure".magenta(),
            name.as_str().blue(),
            ":".white()
        ));
        render_body(&mut output, body);
    }

    output
}

fn render_body(output: &mut String, body: &[l2::Instruction]) {
    for instruction in body {
        match instruction {
            l2::Instruction::Label(_) => output.push_str(&format!("{instruction}\n")),
            _ => output.push_str(&format!("    {instruction}\n")),
        }
    }
}

impl core::fmt::Display for l2::Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl core::fmt::Display for l2::Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let opcode = self.opcode().to_string();

        match self {
            l2::Instruction::SetResult(value) => {
                write!(f, "{} {}", opcode.cyan(), format!("{value}").purple())
            }
            l2::Instruction::PushResult | l2::Instruction::Call => {
                write!(f, "{}", opcode.cyan())
            }
            l2::Instruction::Variable(depth) | l2::Instruction::Set(depth) => {
                write!(f, "{} {}", opcode.cyan(), format!("{depth}").yellow())
            }
            l2::Instruction::Label(name) => {
                write!(f, "{} {}", opcode.bright_red(), name.as_str().blue())
            }
            l2::Instruction::Closure(name)
            | l2::Instruction::Jump(name)
            | l2::Instruction::JumpFalse(name) => {
                write!(f, "{} {}", opcode.cyan(), name.as_str().blue())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stripped_rendering_matches_the_text_format() {
        let program = l2::Program::new(vec![
            l2::Instruction::SetResult(-4),
            l2::Instruction::Label("top".into()),
            l2::Instruction::JumpFalse("top".into()),
        ])
        .with_closure("lambda_0", vec![l2::Instruction::Set(2)]);

        let rendered = strip_ansi_escapes::strip_str(render_program(&program));

        assert_eq!(
            rendered,
            indoc::indoc! {"
                main:
                    set_result -4
                label top
                    jump_false top
                closure lambda_0:
                    set 2
            "}
        );
    }
}
