//! Upfront check that every label an L2 program refers to is defined exactly
//! once. Lowering never needs this; skipping it only moves the failure to
//! assembly or link time of the generated program.

use hashbrown::HashMap;
use thiserror::Error;

use crate::middle::l2::{self, Label};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("`{label}` is referenced in {scope} but never defined")]
    UndefinedLabel { label: Label, scope: Scope },
    #[error("`{label}` is defined in both {first} and {second}")]
    DuplicateLabel {
        label: Label,
        first: Scope,
        second: Scope,
    },
}

/// Where a label was seen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Main,
    Closure(Label),
    Runtime,
}

impl core::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Main => f.write_str("`main`"),
            Scope::Closure(name) => write!(f, "closure `{name}`"),
            Scope::Runtime => f.write_str("the runtime library"),
        }
    }
}

/// Checks label definitions and references across the whole program.
/// `predefined` names symbols provided outside the program itself (the
/// runtime library closures and the entry point).
pub fn validate<'a>(
    program: &l2::Program,
    predefined: impl IntoIterator<Item = &'a str>,
) -> Result<(), ValidationError> {
    let mut definitions: HashMap<Label, Scope> = HashMap::new();

    let mut define = |label: Label, scope: Scope| match definitions.get(&label) {
        Some(first) => Err(ValidationError::DuplicateLabel {
            label,
            first: first.clone(),
            second: scope,
        }),
        None => {
            definitions.insert(label, scope);
            Ok(())
        }
    };

    for name in predefined {
        define(Label::from(name), Scope::Runtime)?;
    }

    for (name, body) in &program.closures {
        define(name.clone(), Scope::Closure(name.clone()))?;

        for instruction in body {
            if let l2::Instruction::Label(label) = instruction {
                define(label.clone(), Scope::Closure(name.clone()))?;
            }
        }
    }

    for instruction in &program.main {
        if let l2::Instruction::Label(label) = instruction {
            define(label.clone(), Scope::Main)?;
        }
    }

    let bodies = std::iter::once((Scope::Main, &program.main)).chain(
        program
            .closures
            .iter()
            .map(|(name, body)| (Scope::Closure(name.clone()), body)),
    );

    for (scope, body) in bodies {
        for label in body.iter().filter_map(l2::Instruction::referenced_label) {
            if !definitions.contains_key(label) {
                return Err(ValidationError::UndefinedLabel {
                    label: label.clone(),
                    scope,
                });
            }
        }
    }

    tracing::debug!(labels = definitions.len(), "validated label table");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middle::l2::{Instruction, Program};

    #[test]
    fn accepts_references_to_closures_labels_and_runtime() {
        let program = Program::new(vec![
            Instruction::Closure("add".into()),
            Instruction::PushResult,
            Instruction::Closure("lambda_0".into()),
            Instruction::Label("end".into()),
            Instruction::JumpFalse("end".into()),
        ])
        .with_closure(
            "lambda_0",
            vec![Instruction::Label("loop".into()), Instruction::Jump("loop".into())],
        );

        assert_eq!(validate(&program, ["add", "main"]), Ok(()));
    }

    #[test]
    fn reports_undefined_jump_target_with_its_scope() {
        let program = Program::new(vec![])
            .with_closure("lambda_0", vec![Instruction::Jump("nowhere".into())]);

        assert_eq!(
            validate(&program, []),
            Err(ValidationError::UndefinedLabel {
                label: "nowhere".into(),
                scope: Scope::Closure("lambda_0".into()),
            })
        );
    }

    #[test]
    fn closure_shadowing_a_runtime_symbol_is_a_duplicate() {
        let program = Program::new(vec![]).with_closure("add", vec![]);

        assert_eq!(
            validate(&program, ["add"]),
            Err(ValidationError::DuplicateLabel {
                label: "add".into(),
                first: Scope::Runtime,
                second: Scope::Closure("add".into()),
            })
        );
    }

    #[test]
    fn label_defined_twice_in_main_is_a_duplicate() {
        let program = Program::new(vec![
            Instruction::Label("again".into()),
            Instruction::Label("again".into()),
        ]);

        assert!(matches!(
            validate(&program, []),
            Err(ValidationError::DuplicateLabel { .. })
        ));
    }
}
