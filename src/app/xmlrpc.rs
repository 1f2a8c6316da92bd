//! Minimal XML-RPC codec. Values are carried as `serde_json::Value`:
//! structs are objects, arrays are arrays, `<nil/>` is null.

use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use serde_json::{Map, Number, Value};

use crate::error::SsError;

pub(crate) fn encode_call(method: &str, params: &[Value]) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?>\n<methodCall><methodName>");
    out.push_str(&escape(method));
    out.push_str("</methodName><params>");
    for param in params {
        out.push_str("<param>");
        encode_value(param, &mut out);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>");
    out
}

fn encode_value(value: &Value, out: &mut String) {
    out.push_str("<value>");
    match value {
        Value::Null => out.push_str("<nil/>"),
        Value::Bool(flag) => {
            out.push_str(if *flag {
                "<boolean>1</boolean>"
            } else {
                "<boolean>0</boolean>"
            });
        }
        Value::Number(number) => match number.as_i64() {
            Some(int) if i32::try_from(int).is_ok() => out.push_str(&format!("<int>{int}</int>")),
            Some(int) => out.push_str(&format!("<i8>{int}</i8>")),
            None => out.push_str(&format!("<double>{number}</double>")),
        },
        Value::String(text) => {
            out.push_str("<string>");
            out.push_str(&escape(text.as_str()));
            out.push_str("</string>");
        }
        Value::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                encode_value(item, out);
            }
            out.push_str("</data></array>");
        }
        Value::Object(members) => {
            out.push_str("<struct>");
            for (name, member) in members {
                out.push_str("<member><name>");
                out.push_str(&escape(name.as_str()));
                out.push_str("</name>");
                encode_value(member, out);
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
    }
    out.push_str("</value>");
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Open(String),
    Close(String),
    Empty(String),
    Text(String),
    Eof,
}

struct TokenReader<'a> {
    reader: Reader<&'a [u8]>,
}

fn protocol(message: impl Into<String>) -> SsError {
    SsError::Protocol(message.into())
}

impl<'a> TokenReader<'a> {
    fn new(raw: &'a str) -> Self {
        let mut reader = Reader::from_str(raw);
        reader.config_mut().trim_text(true);
        Self { reader }
    }

    fn next(&mut self) -> Result<Token, SsError> {
        loop {
            let event = self
                .reader
                .read_event()
                .map_err(|err| protocol(format!("malformed XML: {err}")))?;
            let token = match event {
                Event::Start(tag) => {
                    Token::Open(String::from_utf8_lossy(tag.name().as_ref()).into_owned())
                }
                Event::End(tag) => {
                    Token::Close(String::from_utf8_lossy(tag.name().as_ref()).into_owned())
                }
                Event::Empty(tag) => {
                    Token::Empty(String::from_utf8_lossy(tag.name().as_ref()).into_owned())
                }
                Event::Text(text) => Token::Text(
                    text.unescape()
                        .map_err(|err| protocol(format!("bad text: {err}")))?
                        .into_owned(),
                ),
                Event::CData(data) => {
                    Token::Text(String::from_utf8_lossy(data.into_inner().as_ref()).into_owned())
                }
                Event::Eof => Token::Eof,
                Event::Decl(_) | Event::PI(_) | Event::Comment(_) | Event::DocType(_) => continue,
            };
            return Ok(token);
        }
    }

    fn expect_open(&mut self, name: &str) -> Result<(), SsError> {
        match self.next()? {
            Token::Open(tag) if tag == name => Ok(()),
            other => Err(protocol(format!("expected <{name}>, found {other:?}"))),
        }
    }

    fn expect_close(&mut self, name: &str) -> Result<(), SsError> {
        match self.next()? {
            Token::Close(tag) if tag == name => Ok(()),
            other => Err(protocol(format!("expected </{name}>, found {other:?}"))),
        }
    }

    /// Text content up to `</name>`; empty elements give an empty string.
    fn text_until_close(&mut self, name: &str) -> Result<String, SsError> {
        match self.next()? {
            Token::Text(text) => {
                self.expect_close(name)?;
                Ok(text)
            }
            Token::Close(tag) if tag == name => Ok(String::new()),
            other => Err(protocol(format!("expected text in <{name}>, found {other:?}"))),
        }
    }

    /// Parses the body of a `<value>` whose opening tag was already consumed.
    fn value_body(&mut self) -> Result<Value, SsError> {
        let value = match self.next()? {
            Token::Text(text) => {
                self.expect_close("value")?;
                return Ok(Value::String(text));
            }
            Token::Close(tag) if tag == "value" => return Ok(Value::String(String::new())),
            Token::Empty(tag) => match tag.as_str() {
                "nil" => Value::Null,
                "string" | "base64" | "dateTime.iso8601" => Value::String(String::new()),
                "array" => Value::Array(Vec::new()),
                "struct" => Value::Object(Map::new()),
                other => return Err(protocol(format!("empty <{other}/> has no value"))),
            },
            Token::Open(tag) => self.typed_value(&tag)?,
            other => return Err(protocol(format!("unexpected {other:?} in <value>"))),
        };
        self.expect_close("value")?;
        Ok(value)
    }

    fn typed_value(&mut self, tag: &str) -> Result<Value, SsError> {
        match tag {
            "string" | "base64" | "dateTime.iso8601" => {
                Ok(Value::String(self.text_until_close(tag)?))
            }
            "int" | "i4" | "i8" => {
                let raw = self.text_until_close(tag)?;
                raw.trim()
                    .parse::<i64>()
                    .map(Value::from)
                    .map_err(|_| protocol(format!("bad integer '{raw}'")))
            }
            "boolean" => match self.text_until_close(tag)?.trim() {
                "1" => Ok(Value::Bool(true)),
                "0" => Ok(Value::Bool(false)),
                other => Err(protocol(format!("bad boolean '{other}'"))),
            },
            "double" => {
                let raw = self.text_until_close(tag)?;
                raw.trim()
                    .parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
                    .ok_or_else(|| protocol(format!("bad double '{raw}'")))
            }
            "nil" => {
                self.expect_close("nil")?;
                Ok(Value::Null)
            }
            "array" => self.array_body(),
            "struct" => self.struct_body(),
            other => Err(protocol(format!("unsupported value type <{other}>"))),
        }
    }

    fn array_body(&mut self) -> Result<Value, SsError> {
        let mut items = Vec::new();
        match self.next()? {
            Token::Open(tag) if tag == "data" => loop {
                match self.next()? {
                    Token::Open(tag) if tag == "value" => items.push(self.value_body()?),
                    Token::Close(tag) if tag == "data" => break,
                    other => return Err(protocol(format!("unexpected {other:?} in <data>"))),
                }
            },
            Token::Empty(tag) if tag == "data" => {}
            other => return Err(protocol(format!("expected <data>, found {other:?}"))),
        }
        self.expect_close("array")?;
        Ok(Value::Array(items))
    }

    fn struct_body(&mut self) -> Result<Value, SsError> {
        let mut members = Map::new();
        loop {
            match self.next()? {
                Token::Open(tag) if tag == "member" => {
                    self.expect_open("name")?;
                    let name = self.text_until_close("name")?;
                    let value = match self.next()? {
                        Token::Open(tag) if tag == "value" => self.value_body()?,
                        Token::Empty(tag) if tag == "value" => Value::String(String::new()),
                        other => {
                            return Err(protocol(format!("expected <value>, found {other:?}")));
                        }
                    };
                    self.expect_close("member")?;
                    members.insert(name, value);
                }
                Token::Close(tag) if tag == "struct" => break,
                other => return Err(protocol(format!("unexpected {other:?} in <struct>"))),
            }
        }
        Ok(Value::Object(members))
    }
}

/// Decodes a `<methodResponse>`, turning `<fault>` into an error.
pub(crate) fn decode_response(raw: &str) -> Result<Value, SsError> {
    let mut tokens = TokenReader::new(raw);
    tokens.expect_open("methodResponse")?;
    match tokens.next()? {
        Token::Open(tag) if tag == "params" => {
            tokens.expect_open("param")?;
            tokens.expect_open("value")?;
            let value = tokens.value_body()?;
            tokens.expect_close("param")?;
            tokens.expect_close("params")?;
            Ok(value)
        }
        Token::Open(tag) if tag == "fault" => {
            tokens.expect_open("value")?;
            let fault = tokens.value_body()?;
            let code = fault.get("faultCode").cloned().unwrap_or(Value::Null);
            let message = fault
                .get("faultString")
                .and_then(Value::as_str)
                .unwrap_or("unknown fault");
            Err(protocol(format!("fault {code}: {message}")))
        }
        Token::Eof => Err(protocol("empty methodResponse")),
        other => Err(protocol(format!("unexpected {other:?} in methodResponse"))),
    }
}
