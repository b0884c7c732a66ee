//! Minimal Newick reader producing an arena of nodes.
//!
//! Only the first tree in the input is read. Bracketed comments are skipped,
//! quoting is not supported.

/// Parse failure with the byte offset where it was detected.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("{message} at byte {position}")]
pub struct NewickError {
    pub position: usize,
    pub message: String,
}

impl NewickError {
    fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

/// A node as written in the Newick text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedNode {
    pub children: Vec<usize>,
    pub label: Option<String>,
    pub length: Option<f64>,
}

fn is_delim(b: u8) -> bool {
    matches!(b, b'(' | b')' | b',' | b':' | b';' | b'[' | b']')
}

struct Reader<'a> {
    bytes: &'a [u8],
    idx: usize,
}

impl<'a> Reader<'a> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.idx).copied()
    }

    fn skip_ws(&mut self) {
        while self.idx < self.bytes.len() && self.bytes[self.idx].is_ascii_whitespace() {
            self.idx += 1;
        }
    }

    fn skip_comments(&mut self) -> Result<(), NewickError> {
        self.skip_ws();
        while self.peek() == Some(b'[') {
            let start = self.idx;
            while self.idx < self.bytes.len() && self.bytes[self.idx] != b']' {
                self.idx += 1;
            }
            if self.idx >= self.bytes.len() {
                return Err(NewickError::new(start, "Unterminated comment"));
            }
            self.idx += 1;
            self.skip_ws();
        }
        Ok(())
    }

    fn read_token(&mut self) -> Option<String> {
        self.skip_ws();
        let start = self.idx;
        while self.idx < self.bytes.len() && !is_delim(self.bytes[self.idx]) {
            self.idx += 1;
        }
        let token = String::from_utf8_lossy(&self.bytes[start..self.idx])
            .trim()
            .to_string();
        if token.is_empty() {
            None
        } else {
            Some(token)
        }
    }

    /// Label, comments and `:length` trailing a node.
    fn read_suffix(&mut self) -> Result<(Option<String>, Option<f64>), NewickError> {
        let label = self.read_token();
        self.skip_comments()?;
        let mut length = None;
        if self.peek() == Some(b':') {
            self.idx += 1;
            let start = self.idx;
            let raw = self
                .read_token()
                .ok_or_else(|| NewickError::new(start, "Missing branch length after ':'"))?;
            let value = raw
                .parse::<f64>()
                .map_err(|_| NewickError::new(start, format!("Invalid branch length '{raw}'")))?;
            length = Some(value);
            self.skip_comments()?;
        }
        Ok((label, length))
    }

    /// Read one tree. Open groups live on an explicit stack, so nesting depth
    /// is bounded by memory rather than the thread stack.
    fn subtree(&mut self, nodes: &mut Vec<ParsedNode>) -> Result<usize, NewickError> {
        // Children collected so far for every group whose `(` is still open.
        let mut open: Vec<Vec<usize>> = Vec::new();
        loop {
            self.skip_comments()?;
            let Some(next) = self.peek() else {
                return Err(NewickError::new(self.idx, "Unexpected end of Newick"));
            };
            if next == b'(' {
                self.idx += 1;
                open.push(Vec::new());
                continue;
            }

            let start = self.idx;
            let (label, length) = self.read_suffix()?;
            if label.is_none() {
                return Err(NewickError::new(start, "Expected leaf label in Newick"));
            }
            nodes.push(ParsedNode {
                children: Vec::new(),
                label,
                length,
            });
            let mut done = nodes.len() - 1;

            // Attach the finished node and close every group that ends here.
            loop {
                let Some(children) = open.last_mut() else {
                    return Ok(done);
                };
                children.push(done);
                self.skip_comments()?;
                match self.peek() {
                    Some(b',') => {
                        self.idx += 1;
                        break;
                    }
                    Some(b')') => {
                        self.idx += 1;
                        let children = std::mem::take(children);
                        open.pop();
                        let (label, length) = self.read_suffix()?;
                        nodes.push(ParsedNode {
                            children,
                            label,
                            length,
                        });
                        done = nodes.len() - 1;
                    }
                    Some(_) => {
                        return Err(NewickError::new(self.idx, "Invalid Newick group separator"))
                    }
                    None => return Err(NewickError::new(self.idx, "Unterminated Newick group")),
                }
            }
        }
    }
}

/// Parse Newick text into `(root_index, nodes)`. Children precede parents in `nodes`.
pub fn parse_newick(text: &str) -> Result<(usize, Vec<ParsedNode>), NewickError> {
    let mut reader = Reader {
        bytes: text.as_bytes(),
        idx: 0,
    };
    reader.skip_comments()?;
    if reader.peek().is_none() || reader.peek() == Some(b';') {
        return Err(NewickError::new(reader.idx, "Empty tree"));
    }
    let mut nodes = Vec::new();
    let root = reader.subtree(&mut nodes)?;
    reader.skip_comments()?;
    match reader.peek() {
        None | Some(b';') => Ok((root, nodes)),
        Some(_) => Err(NewickError::new(reader.idx, "Trailing characters after tree")),
    }
}
