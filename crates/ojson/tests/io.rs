#![expect(missing_docs)]

use std::{fs, io::Cursor, path::PathBuf};

use ojson::{
    Error, Options, StreamWriter, Value, dump, dump_to_file, dump_to_writer, parse_file,
    parse_reader,
};

mod common;

/// A scratch file removed when dropped.
struct Scratch(PathBuf);

impl Scratch {
    fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!("ojson-{}-{name}.json", std::process::id()));
        Self(path)
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.0);
    }
}

#[test]
fn file_roundtrip() {
    common::init_tracing();
    let scratch = Scratch::new("file_roundtrip");
    let options = Options {
        indent: 4,
        ..common::strict()
    };
    dump_to_file(&common::original(), &scratch.0, &options).unwrap();

    let text = fs::read_to_string(&scratch.0).unwrap();
    assert_eq!(text, dump(&common::original(), &options).unwrap());
    assert_eq!(parse_file(&scratch.0, &options).unwrap(), common::original());
}

#[test]
fn dump_to_file_truncates() {
    let scratch = Scratch::new("truncates");
    fs::write(&scratch.0, "[1,2,3,4,5,6,7,8,9]").unwrap();
    dump_to_file(&Value::Int(1), &scratch.0, &common::strict()).unwrap();
    assert_eq!(fs::read_to_string(&scratch.0).unwrap(), "1");
}

#[test]
fn missing_file_is_an_io_error() {
    let scratch = Scratch::new("missing");
    let err = parse_file(&scratch.0, &common::strict()).unwrap_err();
    assert!(matches!(err, Error::Io(_)), "{err}");
}

#[test]
fn reader_and_writer_sinks() {
    let mut sink = Vec::new();
    dump_to_writer(&common::original(), &mut sink, &common::object()).unwrap();
    let back = parse_reader(Cursor::new(sink), &common::object()).unwrap();
    assert_eq!(back, common::original());
}

#[test]
fn stream_writer_flushes_on_pop() {
    let mut w = StreamWriter::new(Vec::new(), common::strict());
    w.push_array(None).unwrap();
    w.push_array(None).unwrap();
    w.push_value(&Value::Int(1), None).unwrap();
    w.pop().unwrap();
    w.push_value(&Value::from("tail"), None).unwrap();
    w.pop().unwrap();
    assert_eq!(w.into_inner(), br#"[[1],"tail"]"#);
}

#[test]
fn stream_writer_into_file() {
    let scratch = Scratch::new("stream_writer");
    let file = fs::File::create(&scratch.0).unwrap();
    let mut w = StreamWriter::new(file, common::strict());
    w.push_object(None).unwrap();
    w.push_key("rows").unwrap();
    w.push_array(None).unwrap();
    for i in 0..3 {
        w.push_value(&Value::Int(i), None).unwrap();
    }
    w.pop_all().unwrap();
    drop(w);

    let back = parse_file(&scratch.0, &common::strict()).unwrap();
    assert_eq!(
        back,
        Value::map([("rows", Value::array([0.into(), 1.into(), 2.into()]))])
    );
}
