use std::{any::Any, io::Cursor, rc::Rc};

use rstest::rstest;

use super::{parse, parse_bytes, parse_many, parse_reader, parse_with_host};
use crate::{
    Attr, BigInt, Callbacks, DecimalLoad, Error, Host, HostObject, Key, Map, Mode, NoHost, Options,
    SyntaxError, Time, TypeHandle, Value, dump, saj_parse,
};

fn strict() -> Options {
    Options::with_mode(Mode::Strict)
}

fn object() -> Options {
    Options::default()
}

fn syntax_error(json: &str) -> (SyntaxError, usize, usize, usize) {
    let err = parse(json, &strict()).unwrap_err();
    let Some(p) = err.as_parse_error() else {
        panic!("expected a parse error, got {err}");
    };
    (p.kind().clone(), p.offset, p.line, p.column)
}

#[derive(Debug, PartialEq)]
struct Point {
    x: i64,
    y: i64,
}

impl HostObject for Point {
    fn class_name(&self) -> &str {
        "Point"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Knows `Point` and the members of the `Pair` struct; nothing else.
struct Geometry;

impl Host for Geometry {
    fn resolve_class(&self, name: &str) -> Option<TypeHandle> {
        (name == "Point").then(|| TypeHandle::new("Point", 1))
    }

    fn struct_members(&self, name: &str) -> Option<Vec<String>> {
        (name == "Pair").then(|| vec!["a".to_owned(), "b".to_owned()])
    }

    fn construct(&self, ty: &TypeHandle, fields: Vec<Attr>) -> Result<Value, Error> {
        let field = |name: &str| {
            fields
                .iter()
                .find(|a| a.name == name)
                .and_then(|a| a.value.as_i64())
        };
        match (ty.tag(), field("x"), field("y")) {
            (1, Some(x), Some(y)) => Ok(Value::Other(Rc::new(Point { x, y }))),
            _ => Err(Error::Host(format!("cannot build {}", ty.name()))),
        }
    }
}

fn as_point(value: &Value) -> Option<&Point> {
    match value {
        Value::Other(obj) => obj.as_any().downcast_ref::<Point>(),
        _ => None,
    }
}

#[test]
fn strict_document() {
    let v = parse(r#"{"a": 1, "b": [1,2,3]}"#, &strict()).unwrap();
    let expected = Value::map([
        ("a", Value::Int(1)),
        ("b", Value::array([1.into(), 2.into(), 3.into()])),
    ]);
    assert_eq!(v, expected);
}

#[test]
fn scalars() {
    assert_eq!(parse("null", &strict()).unwrap(), Value::Null);
    assert_eq!(parse(" true ", &strict()).unwrap(), Value::Bool(true));
    assert_eq!(parse("false", &strict()).unwrap(), Value::Bool(false));
    assert_eq!(parse("-0", &strict()).unwrap(), Value::Int(0));
    assert_eq!(parse("2.5e-1", &strict()).unwrap(), Value::Float(0.25));
    assert_eq!(parse(r#""a\/b\n""#, &strict()).unwrap(), Value::from("a/b\n"));
    assert_eq!(parse("[]", &strict()).unwrap(), Value::array([]));
    assert_eq!(parse("{}", &strict()).unwrap(), Value::from(Map::new()));
}

#[rstest]
#[case("[1,2,", SyntaxError::UnterminatedArray, 5, 1, 6)]
#[case("{", SyntaxError::UnterminatedObject, 1, 1, 2)]
#[case(r#"{"a" 1}"#, SyntaxError::ExpectedColon, 5, 1, 6)]
#[case("[1,]", SyntaxError::UnexpectedArrayClose, 3, 1, 4)]
#[case(r#"{"a":1,}"#, SyntaxError::UnexpectedObjectClose, 7, 1, 8)]
#[case("[1 2]", SyntaxError::InvalidCharacter('2'), 3, 1, 4)]
#[case("[01]", SyntaxError::InvalidNumber, 1, 1, 2)]
#[case(":", SyntaxError::UnexpectedColon, 0, 1, 1)]
#[case("]", SyntaxError::UnexpectedArrayClose, 0, 1, 1)]
#[case("nul", SyntaxError::InvalidLiteral, 0, 1, 1)]
#[case("-", SyntaxError::InvalidNumber, 0, 1, 1)]
#[case("{1:2}", SyntaxError::ExpectedKey, 1, 1, 2)]
#[case("", SyntaxError::Empty, 0, 1, 1)]
#[case("  ", SyntaxError::Empty, 2, 1, 3)]
#[case("1 2", SyntaxError::TrailingCharacters, 2, 1, 3)]
#[case("\"abc", SyntaxError::UnterminatedString, 4, 1, 5)]
#[case("\"a\0b\"", SyntaxError::NullByteInString, 2, 1, 3)]
#[case(r#""\q""#, SyntaxError::InvalidEscape('q'), 1, 1, 2)]
#[case(r#""\u12G4""#, SyntaxError::InvalidUnicodeEscapeChar('G'), 1, 1, 2)]
#[case("[1 /* x", SyntaxError::UnterminatedComment, 7, 1, 8)]
#[case("[1,\n 2,\n x]", SyntaxError::InvalidCharacter('x'), 9, 3, 2)]
fn syntax_errors_are_positioned(
    #[case] json: &str,
    #[case] kind: SyntaxError,
    #[case] offset: usize,
    #[case] line: usize,
    #[case] column: usize,
) {
    assert_eq!(syntax_error(json), (kind, offset, line, column));
}

#[test]
fn comments_and_form_feeds_are_whitespace() {
    let v = parse("/* c */ [1, // x\n\x0c2] // end", &strict()).unwrap();
    assert_eq!(v, Value::array([1.into(), 2.into()]));
}

#[test]
fn surrogate_pairs() {
    let v = parse(r#""\ud83d\ude00!""#, &strict()).unwrap();
    assert_eq!(v, Value::from("\u{1F600}!"));
}

#[rstest]
#[case(r#""\ud83d""#, "\u{FFFD}")]
#[case(r#""\ude00x""#, "\u{FFFD}x")]
#[case(r#""\ud83dx""#, "\u{FFFD}x")]
#[case(r#""\ud83d\u0041""#, "\u{FFFD}A")]
fn lone_surrogates(#[case] json: &str, #[case] lenient: &str) {
    assert!(matches!(parse(json, &strict()), Err(Error::Encoding(_))));
    let options = Options {
        allow_invalid_unicode: true,
        ..strict()
    };
    assert_eq!(parse(json, &options).unwrap(), Value::from(lenient));
}

#[test]
fn invalid_utf8_is_an_encoding_error() {
    let err = parse_bytes(b"[\"a\xffb\"]", &strict(), &NoHost).unwrap_err();
    assert!(matches!(err, Error::Encoding(_)), "{err}");
}

#[test]
fn integers_outside_i64_stay_exact() {
    let big = parse("1000000000000000000000000000000", &strict()).unwrap();
    assert_eq!(big, Value::BigInt(BigInt::from(10u128.pow(30))));
    assert_eq!(
        parse("-9223372036854775808", &strict()).unwrap(),
        Value::Int(i64::MIN)
    );
    assert!(matches!(
        parse("9223372036854775808", &strict()).unwrap(),
        Value::BigInt(_)
    ));
}

#[test]
fn decimal_load_policies() {
    let long = "3.14159265358979323846";
    let with = |decimal_load| Options {
        decimal_load,
        ..strict()
    };
    assert_eq!(
        parse(long, &with(DecimalLoad::Auto)).unwrap(),
        Value::Decimal(long.parse().unwrap())
    );
    assert_eq!(
        parse(long, &with(DecimalLoad::Float)).unwrap(),
        Value::Float(core::f64::consts::PI)
    );
    assert_eq!(parse("0.5", &with(DecimalLoad::Auto)).unwrap(), Value::Float(0.5));
    assert_eq!(
        parse("0.5", &with(DecimalLoad::BigDecimal)).unwrap(),
        Value::Decimal("0.5".parse().unwrap())
    );
}

#[test]
fn non_finite_tokens() {
    let v = parse("[NaN,Infinity,-Infinity,3.0e14159265358979323846]", &object()).unwrap();
    let floats: Vec<f64> = (0..4).filter_map(|i| v.at(i)?.as_f64()).collect();
    assert!(floats[0].is_nan());
    assert_eq!(floats[1..], [f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY]);

    let strict_nan = Options {
        allow_nan: false,
        ..strict()
    };
    assert_eq!(
        syntax_error_with("NaN", &strict_nan),
        Some(SyntaxError::InvalidNumber)
    );
    assert_eq!(syntax_error_with("-NaN", &strict()), Some(SyntaxError::InvalidNumber));
}

fn syntax_error_with(json: &str, options: &Options) -> Option<SyntaxError> {
    parse(json, options)
        .err()?
        .as_parse_error()
        .map(|p| p.kind().clone())
}

#[test]
fn depth_guard_is_exact() {
    let options = Options {
        max_depth: 5,
        ..strict()
    };
    assert!(parse("[[[[[]]]]]", &options).is_ok());
    assert!(matches!(
        parse("[[[[[[]]]]]]", &options),
        Err(Error::Nesting { depth: 6, limit: 5 })
    ));
    assert!(parse(r#"{"a":{"a":{"a":{"a":{"a":{}}}}}}"#, &options).unwrap_err().is_nesting());
}

#[test]
fn deep_input_does_not_recurse() {
    struct Ignore;
    impl Callbacks for Ignore {}

    let options = Options {
        max_depth: 100_000,
        ..strict()
    };
    let json = format!("{}{}", "[".repeat(50_000), "]".repeat(50_000));
    assert!(saj_parse(&json, &mut Ignore, &options).is_ok());
}

#[test]
fn symbol_keys() {
    let wab = parse(r#"{"a":1}"#, &Options::with_mode(Mode::Wab)).unwrap();
    let Value::Map(map) = &wab else {
        panic!("expected a map");
    };
    assert_eq!(map.borrow().get(&Key::Sym("a".into())), Some(&Value::Int(1)));

    let options = Options {
        symbol_keys: true,
        ..strict()
    };
    let v = parse(r#"{"b":null}"#, &options).unwrap();
    assert!(matches!(&v, Value::Map(m) if m.borrow().contains_key(&Key::Sym("b".into()))));
}

#[test]
fn object_mode_scalars() {
    assert_eq!(parse(r#"":abc""#, &object()).unwrap(), Value::symbol("abc"));
    assert_eq!(parse(r#""\u003aabc""#, &object()).unwrap(), Value::from(":abc"));
    assert_eq!(parse(r#""^r1""#, &object()).unwrap(), Value::from("^r1"));
    assert_eq!(parse(r#"":abc""#, &strict()).unwrap(), Value::from(":abc"));
    assert_eq!(parse(r#""^r1""#, &strict()).unwrap(), Value::from("^r1"));
    assert_eq!(parse(r#"{"^c":"Foo"}"#, &object()).unwrap(), Value::Class("Foo".into()));
}

#[test]
fn object_mode_times() {
    let tokyo = Value::Time(Time::with_offset(1_325_775_487, 123_456_789, 9 * 3600));
    assert_eq!(parse(r#"{"^t":1325775487.123456789e32400}"#, &object()).unwrap(), tokyo);
    assert_eq!(
        parse(r#"{"^t":"2012-01-05T23:58:07.123456789+09:00"}"#, &object()).unwrap(),
        tokyo
    );
    assert_eq!(
        parse(r#"{"^t":5.5e86400}"#, &object()).unwrap(),
        Value::Time(Time::utc(5, 500_000_000))
    );

    let err = parse(r#"{"^t":9223372036854775807.5e3600}"#, &object()).unwrap_err();
    assert!(matches!(
        err.as_parse_error().map(|p| p.kind()),
        Some(SyntaxError::Other(_))
    ));
}

#[test]
fn object_mode_generic_objects() {
    let v = parse(r#"{"^o":"Point","x":1,"~^y":2,"~~z":3}"#, &object()).unwrap();
    let expected = Value::object(
        "Point",
        [Attr::new("x", 1), Attr::new("^y", 2), Attr::new("~z", 3)],
    );
    assert_eq!(v, expected);
}

#[test]
fn object_mode_host_objects() {
    let v = parse_with_host(r#"{"^o":"Point","x":1,"y":2}"#, &object(), &Geometry).unwrap();
    assert_eq!(as_point(&v), Some(&Point { x: 1, y: 2 }));

    let err = parse_with_host(r#"{"^o":"Nope"}"#, &object(), &Geometry).unwrap_err();
    assert!(matches!(&err, Error::Host(msg) if msg.contains("Nope")), "{err}");
}

#[test]
fn object_mode_structs() {
    let json = r#"{"^u":["Pair",1,"x"]}"#;
    assert_eq!(
        parse(json, &object()).unwrap(),
        Value::structure("Pair", [Attr::new("0", 1), Attr::new("1", "x")])
    );
    assert_eq!(
        parse_with_host(json, &object(), &Geometry).unwrap(),
        Value::structure("Pair", [Attr::new("a", 1), Attr::new("b", "x")])
    );
}

#[test]
fn self_referencing_struct_keeps_identity() {
    let json = r#"{"^i":1,"^u":["Loop","^r1",["^i2","^r1"]]}"#;
    let v = parse(json, &object()).unwrap();
    let Value::Struct(data) = &v else {
        panic!("expected a struct");
    };
    let fields: Vec<Value> = data.borrow().fields.iter().map(|a| a.value.clone()).collect();
    assert_eq!(data.borrow().name, "Loop");
    assert!(v.same_identity(&fields[0]));
    assert!(v.same_identity(&fields[1].at(0).unwrap()));

    let circular = Options {
        circular: true,
        ..object()
    };
    assert_eq!(dump(&v, &circular).unwrap(), json);

    let err = parse(r#"{"^i":1,"^u":"Loop"}"#, &object()).unwrap_err();
    assert!(matches!(
        err.as_parse_error().map(|p| p.kind()),
        Some(SyntaxError::Other(_))
    ));
}

#[test]
fn object_mode_map_keys() {
    let v = parse(r#"{":s":1,"\u003ak":2,"\u005ei":3,"^#1":[7,true]}"#, &object()).unwrap();
    let Value::Map(map) = &v else {
        panic!("expected a map");
    };
    let map = map.borrow();
    assert_eq!(map.get(&Key::Sym("s".into())), Some(&Value::Int(1)));
    assert_eq!(map.get(&Key::from(":k")), Some(&Value::Int(2)));
    assert_eq!(map.get(&Key::from("^i")), Some(&Value::Int(3)));
    assert_eq!(map.get(&Key::Int(7)), Some(&Value::Bool(true)));
    assert_eq!(map.len(), 4);
}

#[test]
fn object_mode_back_references() {
    let a = parse(r#"["^i1","^r1"]"#, &object()).unwrap();
    assert!(a.same_identity(&a.at(0).unwrap()));

    let m = parse(r#"{"^i":1,"a":1,"self":"^r1"}"#, &object()).unwrap();
    assert!(m.same_identity(&m.get("self").unwrap()));
    assert_eq!(m.get("a"), Some(Value::Int(1)));

    let shared = parse(r#"["^i1",["^i2",1],"^r2"]"#, &object()).unwrap();
    assert!(shared.at(1).unwrap().same_identity(&shared.at(2).unwrap()));
    assert_eq!(shared.at(2).and_then(|s| s.at(0)), Some(Value::Int(1)));

    let node = parse(r#"{"^o":"Node","^i":1,"next":"^r1"}"#, &object()).unwrap();
    let Value::Object(data) = &node else {
        panic!("expected an object");
    };
    let next = data.borrow().fields[0].value.clone();
    assert!(node.same_identity(&next));
}

#[test]
fn unknown_back_reference_fails() {
    let err = parse(r#"["^r9"]"#, &object()).unwrap_err();
    assert!(matches!(
        err.as_parse_error().map(|p| p.kind()),
        Some(SyntaxError::Other(_))
    ));
}

#[test]
fn compat_additions_construct_through_host() {
    let json = r#"{"json_class":"Point","x":1,"y":2}"#;
    let additions = |mode| Options {
        create_additions: true,
        ..Options::with_mode(mode)
    };

    let v = parse_with_host(json, &additions(Mode::Compat), &Geometry).unwrap();
    assert_eq!(as_point(&v), Some(&Point { x: 1, y: 2 }));

    let generic = parse(json, &additions(Mode::Custom)).unwrap();
    assert_eq!(
        generic,
        Value::object("Point", [Attr::new("x", 1), Attr::new("y", 2)])
    );

    let plain = parse(json, &Options::with_mode(Mode::Compat)).unwrap();
    assert_eq!(plain.get("json_class"), Some(Value::from("Point")));

    // The tag only counts as the first entry.
    let late = parse(r#"{"x":1,"json_class":"Point"}"#, &additions(Mode::Compat)).unwrap();
    assert!(matches!(late, Value::Map(_)));

    let err = parse_with_host(r#"{"json_class":"Line"}"#, &additions(Mode::Compat), &Geometry)
        .unwrap_err();
    assert!(matches!(err, Error::Host(_)));
}

#[test]
fn many_documents() {
    let opts = strict();
    let docs: Vec<Value> = parse_many(" 1 [2]\n{\"a\":3} ", &opts)
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(
        docs,
        [
            Value::Int(1),
            Value::array([2.into()]),
            Value::map([("a", Value::Int(3))])
        ]
    );

    let mut broken = parse_many("1 [2", &opts);
    assert_eq!(broken.next().map(Result::ok), Some(Some(Value::Int(1))));
    assert!(matches!(broken.next(), Some(Err(Error::Parse(_)))));
    assert!(broken.next().is_none());

    assert_eq!(parse_many("  ", &opts).count(), 0);

    let mut zeros = parse_many("01", &opts);
    assert!(matches!(
        zeros.next(),
        Some(Err(Error::Parse(ref err))) if err.kind() == &SyntaxError::InvalidNumber
    ));
    assert!(zeros.next().is_none());
}

#[test]
fn references_do_not_leak_between_documents() {
    let opts = object();
    let results: Vec<_> = parse_many(r#"["^i1",1] "^r1""#, &opts).collect();
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(results[1].is_err());
}

#[test]
fn reader_input() {
    let v = parse_reader(Cursor::new(b"[true]".to_vec()), &strict()).unwrap();
    assert_eq!(v, Value::array([true.into()]));
}
