use crate::BytesMut;

/// Accumulates emitted source text.
#[derive(Default)]
pub struct Writer {
    writer: BytesMut,
}

impl Writer {
    #[inline]
    pub fn write<B: ToBytes>(&mut self, bytes: B) {
        self.writer.extend_from_slice(bytes.to_bytes());
    }

    /// write `indent` levels of four spaces, then the line, then a newline
    pub fn line(&mut self, indent: usize, text: &str) {
        for _ in 0..indent {
            self.write(b"    ");
        }
        self.write(text);
        self.write(b"\n");
    }

    pub fn blank(&mut self) {
        self.write(b"\n");
    }

    /// write doc-comment lines at the given indent level
    pub fn doc(&mut self, indent: usize, lines: &[String]) {
        for line in lines {
            if line.is_empty() {
                self.line(indent, "///");
            } else {
                self.line(indent, &format!("/// {}", line));
            }
        }
    }

    /// Returns the current buffer, zeroing out self
    pub fn take(&mut self) -> BytesMut {
        self.writer.split_to(self.writer.len())
    }

    pub fn into_string(mut self) -> String {
        String::from_utf8_lossy(&self.take()).to_string()
    }
}

pub trait ToBytes {
    fn to_bytes(&self) -> &[u8];
}
impl ToBytes for &str {
    fn to_bytes(&self) -> &[u8] {
        self.as_bytes()
    }
}
impl ToBytes for &String {
    fn to_bytes(&self) -> &[u8] {
        self.as_bytes()
    }
}
impl ToBytes for &[u8] {
    fn to_bytes(&self) -> &[u8] {
        self
    }
}
impl<const N: usize> ToBytes for &[u8; N] {
    fn to_bytes(&self) -> &[u8] {
        self.as_slice()
    }
}

impl std::fmt::Write for Writer {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        self.write(s.as_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::Writer;

    #[test]
    fn lines_and_docs() {
        let mut w = Writer::default();
        w.doc(0, &["first".to_string(), String::new()]);
        w.line(1, "let x = 1;");
        assert_eq!(w.into_string(), "/// first\n///\n    let x = 1;\n");
    }
}
