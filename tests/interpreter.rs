//! Whole-pipeline tests: scan, parse, resolve, evaluate, compare captured
//! output (or the formatted error).

use rulox as lox;

use lox::error::LoxError;
use lox::interpreter::Interpreter;
use lox::parser::Parser;
use lox::resolver::Resolver;
use lox::scanner::Scanner;
use lox::token::Token;

fn run(source: &str) -> Result<String, LoxError> {
    let mut output: Vec<u8> = Vec::new();

    {
        let mut interpreter = Interpreter::new(&mut output);

        let tokens: Vec<Token> =
            Scanner::new(source.as_bytes()).collect::<Result<Vec<Token>, LoxError>>()?;

        let statements = Parser::new(tokens)
            .parse()
            .map_err(|mut errors| errors.remove(0))?;

        Resolver::new(&mut interpreter).resolve(&statements)?;

        interpreter.interpret(&statements)?;
    }

    Ok(String::from_utf8(output).expect("interpreter output is valid UTF-8"))
}

// ─────────────────────────────────────────────────────────────────────────
// Expressions and statements
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn arithmetic_precedence() {
    assert_eq!(run("print 1 + 2 * 3;").unwrap(), "7\n");
}

#[test]
fn number_rendering_strips_whole_fractions() {
    assert_eq!(run("print 1.0;").unwrap(), "1\n");
    assert_eq!(run("print 2.5;").unwrap(), "2.5\n");
    assert_eq!(run("print 4 / 2;").unwrap(), "2\n");
}

#[test]
fn string_concatenation() {
    assert_eq!(run("print \"foo\" + \"bar\";").unwrap(), "foobar\n");
}

#[test]
fn unary_negation_and_not() {
    assert_eq!(run("print -(1 + 2);").unwrap(), "-3\n");
    assert_eq!(run("print !nil;").unwrap(), "true\n");
    assert_eq!(run("print !0;").unwrap(), "false\n");
}

#[test]
fn truthiness_only_false_and_nil_are_falsey() {
    assert_eq!(run("if (0) print \"zero\";").unwrap(), "zero\n");
    assert_eq!(run("if (\"\") print \"empty\";").unwrap(), "empty\n");
    assert_eq!(run("if (nil) print \"a\"; else print \"b\";").unwrap(), "b\n");
}

#[test]
fn equality_rules() {
    assert_eq!(run("print nil == nil;").unwrap(), "true\n");
    assert_eq!(run("print 1 == 1;").unwrap(), "true\n");
    assert_eq!(run("print 1 == \"1\";").unwrap(), "false\n");
    assert_eq!(run("print \"a\" != \"b\";").unwrap(), "true\n");
}

#[test]
fn logical_operators_return_operands() {
    assert_eq!(run("print \"hi\" or 2;").unwrap(), "hi\n");
    assert_eq!(run("print nil or \"yes\";").unwrap(), "yes\n");
    assert_eq!(run("print nil and 1;").unwrap(), "nil\n");
    assert_eq!(run("print 1 and 2;").unwrap(), "2\n");
}

#[test]
fn short_circuit_skips_right_operand() {
    let source = r#"
        var touched = false;
        fun touch() { touched = true; return true; }
        var ignored = false or true;
        var also_ignored = true or touch();
        print touched;
    "#;
    assert_eq!(run(source).unwrap(), "false\n");
}

#[test]
fn var_defaults_to_nil() {
    assert_eq!(run("var a; print a;").unwrap(), "nil\n");
}

#[test]
fn assignment_is_an_expression() {
    assert_eq!(run("var a = 1; print a = 2;").unwrap(), "2\n");
}

#[test]
fn block_scoping_shadows_and_restores() {
    let source = r#"
        var a = "outer";
        {
            var a = "inner";
            print a;
        }
        print a;
    "#;
    assert_eq!(run(source).unwrap(), "inner\nouter\n");
}

#[test]
fn while_loop() {
    let source = r#"
        var i = 0;
        while (i < 3) {
            print i;
            i = i + 1;
        }
    "#;
    assert_eq!(run(source).unwrap(), "0\n1\n2\n");
}

#[test]
fn for_loop_desugaring_runs_initializer_condition_and_increment() {
    let source = r#"
        var sum = 0;
        for (var i = 1; i <= 4; i = i + 1) sum = sum + i;
        print sum;
    "#;
    assert_eq!(run(source).unwrap(), "10\n");
}

// ─────────────────────────────────────────────────────────────────────────
// Functions and closures
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn function_call_and_return() {
    let source = r#"
        fun max(x, y) {
            if (x > y) return x;
            return y;
        }
        print max(10, 20);
    "#;
    assert_eq!(run(source).unwrap(), "20\n");
}

#[test]
fn implicit_return_is_nil() {
    assert_eq!(run("fun f() {} print f();").unwrap(), "nil\n");
}

#[test]
fn recursion() {
    let source = r#"
        fun fib(n) {
            if (n < 2) return n;
            return fib(n - 1) + fib(n - 2);
        }
        print fib(10);
    "#;
    assert_eq!(run(source).unwrap(), "55\n");
}

#[test]
fn closure_counter_keeps_private_state() {
    let source = r#"
        fun makeCounter() {
            var i = 0;
            fun count() {
                i = i + 1;
                return i;
            }
            return count;
        }
        var c = makeCounter();
        print c();
        print c();
        print c();
    "#;
    assert_eq!(run(source).unwrap(), "1\n2\n3\n");
}

#[test]
fn closures_sharing_a_scope_see_each_others_writes() {
    let source = r#"
        var get;
        var set;
        {
            var shared = "initial";
            fun reader() { return shared; }
            fun writer(v) { shared = v; }
            get = reader;
            set = writer;
        }
        set("updated");
        print get();
    "#;
    assert_eq!(run(source).unwrap(), "updated\n");
}

#[test]
fn resolver_fixes_bindings_at_function_creation() {
    let source = r#"
        var a = "global";
        {
            fun showA() { print a; }
            showA();
            var a = "block";
            showA();
        }
    "#;
    assert_eq!(run(source).unwrap(), "global\nglobal\n");
}

#[test]
fn functions_render_by_name() {
    assert_eq!(run("fun f() {} print f;").unwrap(), "<fn f>\n");
    assert_eq!(run("print clock;").unwrap(), "<native fn clock>\n");
}

#[test]
fn clock_returns_a_number() {
    assert_eq!(run("print clock() > 0;").unwrap(), "true\n");
}

// ─────────────────────────────────────────────────────────────────────────
// Classes, instances, inheritance
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn class_with_init_and_method() {
    let source = r#"
        class Greeter {
            init(n) { this.n = n; }
            hi() { print "Hi " + this.n; }
        }
        Greeter("X").hi();
    "#;
    assert_eq!(run(source).unwrap(), "Hi X\n");
}

#[test]
fn classes_and_instances_render() {
    let source = r#"
        class Thing {}
        print Thing;
        print Thing();
    "#;
    assert_eq!(run(source).unwrap(), "Thing\nThing instance\n");
}

#[test]
fn fields_shadow_methods() {
    let source = r#"
        class C {
            label() { return "method"; }
        }
        var c = C();
        fun replacement() { return "field"; }
        c.label = replacement;
        print c.label();
    "#;
    assert_eq!(run(source).unwrap(), "field\n");
}

#[test]
fn methods_bind_this_even_when_detached() {
    let source = r#"
        class Speaker {
            init(name) { this.name = name; }
            speak() { print this.name; }
        }
        var method = Speaker("bound").speak;
        method();
    "#;
    assert_eq!(run(source).unwrap(), "bound\n");
}

#[test]
fn calling_init_again_returns_the_instance() {
    let source = r#"
        class Foo {
            init() { this.bar = 1; }
        }
        var foo = Foo();
        print foo.init();
    "#;
    assert_eq!(run(source).unwrap(), "Foo instance\n");
}

#[test]
fn bare_return_in_init_yields_the_instance() {
    let source = r#"
        class Foo {
            init(flag) {
                if (flag) return;
                this.tag = "ran";
            }
        }
        print Foo(true);
        var f = Foo(false);
        print f.tag;
    "#;
    assert_eq!(run(source).unwrap(), "Foo instance\nran\n");
}

#[test]
fn methods_are_inherited() {
    let source = r#"
        class A { say() { print "A"; } }
        class B < A {}
        B().say();
    "#;
    assert_eq!(run(source).unwrap(), "A\n");
}

#[test]
fn super_dispatches_to_the_superclass_method() {
    let source = r#"
        class A { say() { print "A"; } }
        class B < A {
            say() {
                super.say();
                print "B";
            }
        }
        B().say();
    "#;
    assert_eq!(run(source).unwrap(), "A\nB\n");
}

#[test]
fn super_binds_this_from_the_caller() {
    let source = r#"
        class Base {
            whoami() { return this.name; }
        }
        class Derived < Base {
            init(name) { this.name = name; }
            describe() { print super.whoami(); }
        }
        Derived("self").describe();
    "#;
    assert_eq!(run(source).unwrap(), "self\n");
}

#[test]
fn init_arity_comes_from_the_superclass_when_not_overridden() {
    let source = r#"
        class Base {
            init(x) { this.x = x; }
        }
        class Derived < Base {}
        print Derived(7).x;
    "#;
    assert_eq!(run(source).unwrap(), "7\n");
}

// ─────────────────────────────────────────────────────────────────────────
// Runtime errors
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn subtracting_a_string_is_a_runtime_error() {
    let error = run("print \"x\" - 1;").unwrap_err();

    assert_eq!(error.to_string(), "Operands must be numbers.\n[line 1]");
}

#[test]
fn adding_string_and_number_is_a_runtime_error() {
    let error = run("print \"a\" + 1;").unwrap_err();

    assert_eq!(
        error.to_string(),
        "Operands must be two numbers or two strings.\n[line 1]"
    );
}

#[test]
fn division_by_zero_is_a_runtime_error() {
    let error = run("print 1 / 0;").unwrap_err();

    assert_eq!(error.to_string(), "Division by zero.\n[line 1]");
}

#[test]
fn negating_a_string_is_a_runtime_error() {
    let error = run("print -\"x\";").unwrap_err();

    assert_eq!(error.to_string(), "Operand must be a number.\n[line 1]");
}

#[test]
fn undefined_variable_read() {
    let error = run("print ghost;").unwrap_err();

    assert_eq!(error.to_string(), "Undefined variable 'ghost'.\n[line 1]");
}

#[test]
fn undefined_variable_assignment() {
    let error = run("ghost = 1;").unwrap_err();

    assert_eq!(error.to_string(), "Undefined variable 'ghost'.\n[line 1]");
}

#[test]
fn calling_a_non_callable() {
    let error = run("\"not a function\"();").unwrap_err();

    assert_eq!(
        error.to_string(),
        "Can only call functions and classes.\n[line 1]"
    );
}

#[test]
fn arity_mismatch() {
    let error = run("fun f(a) {}\nf(1, 2);").unwrap_err();

    assert_eq!(
        error.to_string(),
        "Expected 1 arguments but got 2.\n[line 2]"
    );
}

#[test]
fn property_access_on_non_instance() {
    let error = run("true.field;").unwrap_err();

    assert_eq!(
        error.to_string(),
        "Only instances have properties.\n[line 1]"
    );
}

#[test]
fn field_write_on_non_instance() {
    let error = run("1.field = 2;").unwrap_err();

    assert_eq!(error.to_string(), "Only instances have fields.\n[line 1]");
}

#[test]
fn undefined_property() {
    let error = run("class C {}\nC().missing;").unwrap_err();

    assert_eq!(error.to_string(), "Undefined property 'missing'.\n[line 2]");
}

#[test]
fn undefined_super_method() {
    let source = r#"class A {}
class B < A { go() { super.missing(); } }
B().go();"#;
    let error = run(source).unwrap_err();

    assert_eq!(error.to_string(), "Undefined property 'missing'.\n[line 2]");
}

#[test]
fn superclass_must_be_a_class() {
    let error = run("var NotAClass = 1;\nclass C < NotAClass {}").unwrap_err();

    assert_eq!(
        error.to_string(),
        "Superclass must be a class.\n[line 2]"
    );
}

#[test]
fn runtime_error_inside_a_block_restores_the_environment() {
    // The undefined read faults inside the block; the session keeps going
    // with the outer environment intact.
    let source = r#"
        var a = "kept";
        { var b = missing; }
    "#;
    assert!(run(source).is_err());
    assert_eq!(run("var a = \"kept\"; print a;").unwrap(), "kept\n");
}
