use minilisp::Error;
use minilisp::builtins::all_ops;
use minilisp::evaluator::Environment;
use minilisp::interpreter::Interpreter;
use minilisp::parser::parse_forms;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::panic;
use std::process;

fn main() {
    let mut args = std::env::args().skip(1);

    if let Some(path) = args.next() {
        process::exit(run_file(&path));
    }

    let result = panic::catch_unwind(|| {
        run_repl();
    });

    if let Err(panic_info) = result {
        eprintln!("The REPL encountered an unexpected error and must exit.");

        if let Some(msg) = panic_info.downcast_ref::<&str>() {
            eprintln!("Error: {msg}");
        } else if let Some(msg) = panic_info.downcast_ref::<String>() {
            eprintln!("Error: {msg}");
        } else {
            eprintln!("Error: Unknown panic occurred");
        }

        process::exit(1);
    }
}

/// Execute a source file one top-level form at a time, printing each result.
/// The first failing form is reported and aborts the run.
fn run_file(path: &str) -> i32 {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error: could not read {path}: {e}");
            return 1;
        }
    };

    let forms = match parse_forms(&source) {
        Ok(forms) => forms,
        Err(e) => {
            eprintln!("{path}: {}", Error::from(e));
            return 1;
        }
    };

    let mut interp = Interpreter::new();
    for form in &forms {
        match minilisp::evaluator::evaluate(form, interp.env_mut()) {
            Ok(result) => println!("{result}"),
            Err(e) => {
                eprintln!("Error: {e}");
                return 1;
            }
        }
    }
    0
}

fn run_repl() {
    println!("Minilisp interpreter");
    println!("Enter S-expressions like: (+ 1 2)");
    println!("Unbalanced input continues on the next line.");
    println!("Type :help for commands, or Ctrl+C to exit.");
    println!();

    let mut rl = DefaultEditor::new().expect("Could not initialize REPL");
    let mut interp = Interpreter::new();

    // Lines accumulate here until they form complete expressions
    let mut buffer = String::new();

    loop {
        let prompt = if buffer.is_empty() {
            "minilisp> "
        } else {
            "......... "
        };

        match rl.readline(prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if buffer.is_empty() {
                    if trimmed.is_empty() {
                        continue;
                    }

                    // Commands are only recognized at the start of an input
                    match trimmed {
                        ":help" => {
                            print_help();
                            continue;
                        }
                        ":env" => {
                            print_environment(interp.env());
                            continue;
                        }
                        ":quit" | ":exit" => {
                            println!("Goodbye!");
                            break;
                        }
                        _ => {}
                    }
                }

                if !buffer.is_empty() {
                    buffer.push('\n');
                }
                buffer.push_str(&line);

                // An incomplete parse means the expression continues on the
                // next line; anything else resolves the buffered input
                match interp.run(&buffer) {
                    Err(Error::ParseError(e)) if e.is_incomplete() => continue,
                    result => {
                        let _ = rl.add_history_entry(buffer.trim());
                        buffer.clear();
                        match result {
                            Ok(Some(value)) => println!("{value}"),
                            Ok(None) => {}
                            Err(e) => println!("Error: {e}"),
                        }
                    }
                }
            }

            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                println!("Error: {err:?}");
                break;
            }
        }
    }
}

fn print_help() {
    println!("Minilisp interpreter:");
    println!("  :help  - Show this help message");
    println!("  :env   - Show current environment bindings");
    println!("  :quit  - Exit the interpreter");
    println!("  :exit  - Exit the interpreter");
    println!("  Ctrl+C - Exit the interpreter");
    println!();
    println!("Supported operations:");
    println!("  Numbers: 42, -5, 2.5 (whole results print as integers)");
    println!("  Arithmetic: +, -, *, /");
    println!("  Comparison: equal, =, <, >, <=, >=");
    println!("  Predicates and lists: atom, list");
    println!("  Special forms: quote ('x), setq, defun, cond, while");
    println!();
    println!("Examples:");
    println!("  (+ 1 2 3)");
    println!("  (setq x 10)");
    println!("  (defun square (n) (* n n))");
    println!("  (cond ((< x 5) small) (t big))");
    println!("  (factorial 10)");
    println!();
}

fn print_environment(env: &Environment) {
    let ops = all_ops();
    println!("Built-in operators ({}):", ops.len());
    let mut col = 0;
    for op in ops {
        print!("  {:<8}", op.name);
        col += 1;
        if col % 6 == 0 {
            println!();
        }
    }
    if col % 6 != 0 {
        println!();
    }
    println!();

    let variables = env.all_variables();
    println!("Variables ({}):", variables.len());
    for (name, value) in variables {
        println!("  {name} = {value}");
    }
    println!();

    let functions = env.all_functions();
    println!("Functions ({}):", functions.len());
    for (name, def) in functions {
        println!("  ({name} ({})) -> {}", def.params().join(" "), def.body());
    }
}
