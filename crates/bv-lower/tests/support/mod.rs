//! Shared fixtures for bv-lower integration tests.

#![allow(dead_code)]

pub mod ast;
pub mod exec;

use bv_core::ast::Program;
use bv_core::vir;
use bv_core::TranslationOptions;
use bv_lower::WholeProgramTranslator;

use exec::{Machine, Stop, Value};

pub fn translate(program: &Program, options: &TranslationOptions) -> vir::Program {
    WholeProgramTranslator::new(options)
        .translate(program)
        .expect("translation succeeds")
        .program
}

/// What running `Test.Run` did: the `Log.Mark` arguments in order and the
/// type of the exception that escaped, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub marks: Vec<i64>,
    pub escaped: Option<String>,
    pub stop: Option<Stop>,
}

pub fn run_with(program: &Program, options: &TranslationOptions) -> Run {
    let lowered = translate(program, options);
    let mut machine = Machine::new(&lowered, program);
    let stop = machine.call(ast::ENTRY, Vec::new()).err();
    let marks = machine
        .calls_to(ast::MARK)
        .into_iter()
        .map(|args| match args.as_slice() {
            [Value::Int(n)] => *n,
            other => panic!("unexpected Mark arguments {:?}", other),
        })
        .collect();
    Run {
        marks,
        escaped: machine.pending_exception(),
        stop,
    }
}

pub fn run(program: &Program) -> Run {
    run_with(program, &TranslationOptions::default())
}
