use rlox::interpreter::Interpreter;

// Runs a program against a fresh interpreter and returns everything it
// printed, or the rendered diagnostics if the run failed.
fn run(code: &str) -> Result<String, Vec<String>> {
    let mut buffer: Vec<u8> = Vec::new();

    {
        let mut interpreter = Interpreter::new(&mut buffer);

        if let Err(failure) = rlox::run(code.as_bytes(), &mut interpreter, 0) {
            return Err(failure.errors.iter().map(ToString::to_string).collect());
        }
    }

    Ok(String::from_utf8(buffer).expect("program output should be UTF-8"))
}

fn output(code: &str) -> String {
    run(code).expect("program should run cleanly")
}

fn first_error(code: &str) -> String {
    match run(code) {
        Ok(out) => panic!("expected a runtime error, got output: {:?}", out),
        Err(errors) => errors.into_iter().next().expect("at least one error"),
    }
}

#[test]
fn closures_capture_their_defining_environment() {
    let code = "\
        var a = \"global\";\n\
        {\n\
            fun showA() { print a; }\n\
            showA();\n\
            var a = \"block\";\n\
            showA();\n\
        }";

    // The second call still sees the global, not the later shadow.
    assert_eq!(output(code), "global\nglobal\n");
}

#[test]
fn closures_share_mutable_state() {
    let code = "\
        fun makeCounter() {\n\
            var i = 0;\n\
            fun count() {\n\
                i = i + 1;\n\
                print i;\n\
            }\n\
            return count;\n\
        }\n\
        var counter = makeCounter();\n\
        counter();\n\
        counter();";

    assert_eq!(output(code), "1\n2\n");
}

#[test]
fn variable_scoping_and_shadowing() {
    let code = "\
        var a = \"global a\";\n\
        var b = \"global b\";\n\
        {\n\
            var a = \"outer a\";\n\
            {\n\
                var a = \"inner a\";\n\
                print a;\n\
                print b;\n\
            }\n\
            print a;\n\
        }\n\
        print a;";

    assert_eq!(output(code), "inner a\nglobal b\nouter a\nglobal a\n");
}

#[test]
fn for_loop_counts() {
    let code = "for (var i = 0; i < 3; i = i + 1) print i;";

    assert_eq!(output(code), "0\n1\n2\n");
}

#[test]
fn while_loop_accumulates() {
    let code = "\
        var sum = 0;\n\
        var i = 1;\n\
        while (i <= 4) {\n\
            sum = sum + i;\n\
            i = i + 1;\n\
        }\n\
        print sum;";

    assert_eq!(output(code), "10\n");
}

#[test]
fn if_else_branches() {
    assert_eq!(output("if (1 < 2) print \"yes\"; else print \"no\";"), "yes\n");
    assert_eq!(output("if (1 > 2) print \"yes\"; else print \"no\";"), "no\n");
}

#[test]
fn arithmetic_precedence() {
    assert_eq!(output("print (1 + 2) * 3;"), "9\n");
    assert_eq!(output("print 1 + 2 * 3;"), "7\n");
}

#[test]
fn string_concatenation() {
    assert_eq!(output("print \"a\" + \"b\";"), "ab\n");
}

#[test]
fn mixed_plus_is_a_runtime_error() {
    let message = first_error("print 1 + \"a\";");

    assert!(message.contains("two numbers or two strings"));
    assert!(message.contains("[line 1]"));
}

#[test]
fn arithmetic_on_non_numbers_is_a_runtime_error() {
    assert!(first_error("print -\"a\";").contains("Operand must be a number."));
    assert!(first_error("print 1 < \"a\";").contains("Operands must be numbers."));
}

#[test]
fn division_by_zero_follows_ieee() {
    assert_eq!(output("print 1 / 0;"), "inf\n");
    assert_eq!(output("print (0 / 0) == (0 / 0);"), "false\n");
}

#[test]
fn number_display_trims_integral_fractions() {
    assert_eq!(output("print 2.0;"), "2\n");
    assert_eq!(output("print 0.5;"), "0.5\n");
    assert_eq!(output("print 10 / 4;"), "2.5\n");
}

#[test]
fn short_circuit_returns_the_operand() {
    assert_eq!(output("print nil or \"default\";"), "default\n");
    assert_eq!(output("print \"hi\" and 2;"), "2\n");
    assert_eq!(output("print nil and 2;"), "nil\n");
}

#[test]
fn short_circuit_skips_the_right_operand() {
    // The division never runs, so no error escapes.
    assert_eq!(output("print false and (1 / 0);"), "false\n");
    assert_eq!(output("print true or missing;"), "true\n");
}

#[test]
fn truthiness() {
    assert_eq!(output("print !nil;"), "true\n");
    assert_eq!(output("print !false;"), "true\n");
    assert_eq!(output("print !0;"), "false\n");
    assert_eq!(output("print !\"\";"), "false\n");
}

#[test]
fn equality_never_errors_across_types() {
    assert_eq!(output("print 1 == 1;"), "true\n");
    assert_eq!(output("print nil == nil;"), "true\n");
    assert_eq!(output("print 1 == \"1\";"), "false\n");
    assert_eq!(output("print nil == false;"), "false\n");
    assert_eq!(output("print \"a\" != \"b\";"), "true\n");
}

#[test]
fn callable_equality_is_identity() {
    let code = "\
        fun f() {}\n\
        fun g() {}\n\
        print f == f;\n\
        print f == g;\n\
        print clock == clock;";

    assert_eq!(output(code), "true\nfalse\ntrue\n");
}

#[test]
fn uninitialized_variables_default_to_nil() {
    assert_eq!(output("var a; print a;"), "nil\n");
}

#[test]
fn recursion_through_return() {
    let code = "\
        fun f(n) {\n\
            if (n <= 1) return 1;\n\
            return n * f(n - 1);\n\
        }\n\
        print f(5);";

    assert_eq!(output(code), "120\n");
}

#[test]
fn fibonacci() {
    let code = "\
        fun fib(n) {\n\
            if (n < 2) return n;\n\
            return fib(n - 1) + fib(n - 2);\n\
        }\n\
        print fib(10);";

    assert_eq!(output(code), "55\n");
}

#[test]
fn return_tunnels_out_of_nested_loops() {
    let code = "\
        fun firstOver(limit) {\n\
            for (var i = 0; i < 100; i = i + 1) {\n\
                if (i > limit) {\n\
                    return i;\n\
                }\n\
            }\n\
        }\n\
        print firstOver(5);";

    assert_eq!(output(code), "6\n");
}

#[test]
fn functions_without_return_yield_nil() {
    assert_eq!(output("fun f() {} print f();"), "nil\n");
}

#[test]
fn functions_are_first_class() {
    let code = "\
        fun twice(f, x) {\n\
            return f(f(x));\n\
        }\n\
        fun inc(n) { return n + 1; }\n\
        print twice(inc, 5);";

    assert_eq!(output(code), "7\n");
}

#[test]
fn assignment_is_an_expression() {
    assert_eq!(output("var a = 1; print a = 2;"), "2\n");
}

#[test]
fn callable_display() {
    assert_eq!(output("fun g() {} print g;"), "<fn g>\n");
    assert_eq!(output("print clock;"), "<native fn clock>\n");
}

#[test]
fn clock_returns_a_number() {
    assert_eq!(output("print clock() > 0;"), "true\n");
}

#[test]
fn wrong_arity_is_a_runtime_error() {
    let message = first_error("fun f(a, b) { return a; } f(1);");
    assert!(message.contains("Expected 2 arguments but got 1."));

    let message = first_error("clock(1);");
    assert!(message.contains("Expected 0 arguments but got 1."));
}

#[test]
fn calling_a_non_callable_is_a_runtime_error() {
    let message = first_error("var x = 1; x();");
    assert!(message.contains("Can only call functions and classes."));
}

#[test]
fn undefined_variable_is_a_runtime_error() {
    let message = first_error("print missing;");

    assert!(message.contains("Undefined variable 'missing'."));
    assert!(message.contains("[line 1]"));
}

#[test]
fn undefined_assignment_is_a_runtime_error() {
    let message = first_error("missing = 1;");
    assert!(message.contains("Undefined variable 'missing'."));
}

#[test]
fn runtime_error_reports_the_right_line() {
    let message = first_error("var a = 1;\nvar b = 2;\nprint a + \"x\";");
    assert!(message.contains("[line 3]"), "got: {}", message);
}

#[test]
fn block_environment_is_restored_after_an_error() {
    // The failing block must not leak its scope: `a` is still the global
    // one afterwards.
    let mut buffer: Vec<u8> = Vec::new();

    {
        let mut interpreter = Interpreter::new(&mut buffer);

        let first = rlox::run(b"var a = 1; { var a = 2; missing(); }", &mut interpreter, 0);
        let next_id = match first {
            Err(failure) => failure.next_id,
            Ok(_) => panic!("expected a runtime error"),
        };

        rlox::run(b"print a;", &mut interpreter, next_id).expect("second line should run");
    }

    assert_eq!(String::from_utf8(buffer).unwrap(), "1\n");
}

#[test]
fn state_persists_across_runs() {
    // Mirrors the REPL: one interpreter, several lines, shared globals and
    // closures.
    let mut buffer: Vec<u8> = Vec::new();

    {
        let mut interpreter = Interpreter::new(&mut buffer);

        let mut next_id = 0;
        for line in [
            "fun makeAdder(n) { fun add(x) { return x + n; } return add; }",
            "var addTwo = makeAdder(2);",
            "print addTwo(40);",
        ] {
            next_id = rlox::run(line.as_bytes(), &mut interpreter, next_id)
                .expect("line should run cleanly");
        }
    }

    assert_eq!(String::from_utf8(buffer).unwrap(), "42\n");
}
