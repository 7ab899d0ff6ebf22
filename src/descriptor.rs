use crate::result::*;

use std::fmt::{self, Write};
use std::str::FromStr;

/// All types present in a type descriptor.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Type {
    Boolean,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Char,
    Reference(String),
}

/// A `TypeDescriptor` is either a field descriptor, a single type
/// (parameter or return type) of a method, or an element value of an
/// annotation.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TypeDescriptor {
    /// The array dimensions of the type.
    ///
    /// ```
    /// use classfile::TypeDescriptor;
    /// let desc: TypeDescriptor = "[[I".parse().unwrap();
    /// assert_eq!(desc.dimensions, 2);
    /// ```
    pub dimensions: u8,

    /// The base (element) type.
    ///
    /// ```
    /// use classfile::{Type, TypeDescriptor};
    ///
    /// let short_desc: TypeDescriptor = "S".parse().unwrap();
    /// assert_eq!(short_desc.base_type, Type::Short);
    ///
    /// let string_desc: TypeDescriptor = "[Ljava/lang/String;".parse().unwrap();
    /// assert_eq!(
    ///     string_desc.base_type,
    ///     Type::Reference("java/lang/String".to_owned())
    /// );
    /// ```
    pub base_type: Type,
}

impl TypeDescriptor {
    pub fn new(dimensions: u8, base_type: Type) -> TypeDescriptor {
        TypeDescriptor {
            dimensions,
            base_type,
        }
    }
}

impl FromStr for TypeDescriptor {
    type Err = Error;

    /// ```
    /// use classfile::{Type, TypeDescriptor};
    ///
    /// let desc: TypeDescriptor = "[[[D".parse().unwrap();
    /// assert_eq!(desc, TypeDescriptor::new(3, Type::Double));
    /// ```
    fn from_str(desc: &str) -> Result<TypeDescriptor> {
        let mut chars = desc.chars();
        let mut dimensions: u8 = 0;
        let mut i = 0;

        macro_rules! err {
            () => {{
                return Err(Error::InvalidDescriptor {
                    desc: desc.to_owned(),
                    at: i,
                });
            }};
        }

        loop {
            let ch = match chars.next() {
                Some(ch) => ch,
                None => err!(),
            };

            if ch == '[' {
                dimensions = match dimensions.checked_add(1) {
                    Some(d) => d,
                    None => err!(),
                };
                i += 1;
            } else if ch == 'L' {
                break;
            } else {
                if chars.clone().count() != 0 {
                    err!();
                }

                return Ok(TypeDescriptor::new(
                    dimensions,
                    match ch {
                        'Z' => Type::Boolean,
                        'B' => Type::Byte,
                        'S' => Type::Short,
                        'I' => Type::Int,
                        'J' => Type::Long,
                        'F' => Type::Float,
                        'D' => Type::Double,
                        'C' => Type::Char,
                        _ => err!(),
                    },
                ));
            }
        }

        let mut name = String::with_capacity((desc.len() - dimensions as usize).max(2) - 2);

        loop {
            let ch = match chars.next() {
                Some(ch) => ch,
                None => err!(),
            };
            i += 1;
            if ch == ';' {
                if name.is_empty() || chars.clone().count() != 0 {
                    err!();
                }
                return Ok(TypeDescriptor::new(dimensions, Type::Reference(name)));
            } else {
                name.push(ch);
            }
        }
    }
}

impl fmt::Display for TypeDescriptor {
    /// ```
    /// use classfile::{Type, TypeDescriptor};
    ///
    /// let mut desc: TypeDescriptor = "[[Ljava/lang/String;".parse().unwrap();
    /// desc.base_type = Type::Float;
    /// assert_eq!("[[F", desc.to_string());
    /// ```
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&"[".repeat(self.dimensions as usize))?;
        match self.base_type {
            Type::Boolean => f.write_char('Z'),
            Type::Byte => f.write_char('B'),
            Type::Short => f.write_char('S'),
            Type::Int => f.write_char('I'),
            Type::Long => f.write_char('J'),
            Type::Float => f.write_char('F'),
            Type::Double => f.write_char('D'),
            Type::Char => f.write_char('C'),
            Type::Reference(ref name) => write!(f, "L{};", name),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct MethodDescriptor {
    /// The parameter types of the method.
    ///
    /// ```
    /// use classfile::{Type, MethodDescriptor};
    ///
    /// let desc: MethodDescriptor = "(Z)V".parse().unwrap();
    /// assert_eq!(Type::Boolean, desc.params[0].base_type);
    /// ```
    pub params: Vec<TypeDescriptor>,

    /// The return type of the method. `None` indicates `void`.
    ///
    /// ```
    /// use classfile::{Type, MethodDescriptor};
    ///
    /// let desc: MethodDescriptor = "()I".parse().unwrap();
    /// assert_eq!(Type::Int, desc.return_type.unwrap().base_type);
    /// ```
    pub return_type: Option<TypeDescriptor>,
}

impl MethodDescriptor {
    pub fn new(
        params: Vec<TypeDescriptor>,
        return_type: Option<TypeDescriptor>,
    ) -> MethodDescriptor {
        MethodDescriptor {
            params,
            return_type,
        }
    }
}

impl FromStr for MethodDescriptor {
    type Err = Error;

    /// ```
    /// use classfile::{Type, TypeDescriptor, MethodDescriptor};
    ///
    /// let desc: MethodDescriptor = "([[DLjava/lang/Integer;)V".parse().unwrap();
    /// assert_eq!(desc, MethodDescriptor::new(
    ///     vec![
    ///         TypeDescriptor::new(2, Type::Double),
    ///         TypeDescriptor::new(0, Type::Reference("java/lang/Integer".to_owned())),
    ///     ],
    ///     None,
    /// ));
    /// ```
    fn from_str(desc: &str) -> Result<MethodDescriptor> {
        let mut chars = desc.chars();
        let mut i = 0;

        macro_rules! err {
            () => {{
                return Err(Error::InvalidDescriptor {
                    desc: desc.to_owned(),
                    at: i,
                });
            }};
        }

        match chars.next() {
            Some('(') => {}
            _ => err!(),
        }

        let mut params = Vec::new();
        let mut ret = None;
        let mut state = 0;

        'type_loop: loop {
            let mut dimensions: u8 = 0;

            for ch in &mut chars {
                i += 1;
                if ch == '[' {
                    dimensions = match dimensions.checked_add(1) {
                        Some(d) => d,
                        None => err!(),
                    };
                } else if state == 0 && ch == ')' {
                    if dimensions != 0 {
                        err!();
                    }
                    state = 1;
                } else if state == 1 && ch == 'V' {
                    if dimensions != 0 {
                        err!();
                    }
                    break 'type_loop;
                } else {
                    let parsed_desc = TypeDescriptor::new(
                        dimensions,
                        match ch {
                            'Z' => Type::Boolean,
                            'B' => Type::Byte,
                            'S' => Type::Short,
                            'I' => Type::Int,
                            'J' => Type::Long,
                            'F' => Type::Float,
                            'D' => Type::Double,
                            'C' => Type::Char,
                            'L' => break,
                            _ => err!(),
                        },
                    );

                    if state == 0 {
                        params.push(parsed_desc);
                        continue 'type_loop;
                    } else {
                        ret = Some(parsed_desc);
                        break 'type_loop;
                    }
                }
            }

            let mut name = String::new();

            for ch in &mut chars {
                i += 1;
                if ch == ';' {
                    if name.is_empty() {
                        err!();
                    }
                    let parsed_desc = TypeDescriptor::new(dimensions, Type::Reference(name));
                    if state == 0 {
                        params.push(parsed_desc);
                        continue 'type_loop;
                    } else {
                        ret = Some(parsed_desc);
                        break 'type_loop;
                    }
                } else {
                    name.push(ch);
                }
            }

            err!();
        }

        if chars.count() != 0 || params.len() > 255 {
            err!();
        }

        Ok(MethodDescriptor::new(params, ret))
    }
}

impl fmt::Display for MethodDescriptor {
    /// ```
    /// use classfile::MethodDescriptor;
    ///
    /// let desc: MethodDescriptor = "(Ljava/lang/String;)I".parse().unwrap();
    /// assert_eq!("(Ljava/lang/String;)I", desc.to_string());
    /// ```
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_char('(')?;
        for param in &self.params {
            param.fmt(f)?;
        }
        f.write_char(')')?;
        if let Some(ref ret) = self.return_type {
            ret.fmt(f)
        } else {
            f.write_char('V')
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn td_parse() {
        fn parse(s: &str) -> Result<TypeDescriptor> {
            s.parse()
        }

        assert_eq!(parse("I").unwrap(), TypeDescriptor::new(0, Type::Int));
        assert_eq!(parse("[[B").unwrap(), TypeDescriptor::new(2, Type::Byte));
        assert_eq!(
            parse("[Ljava/lang/String;").unwrap(),
            TypeDescriptor::new(1, Type::Reference("java/lang/String".to_owned()))
        );

        assert!(parse("U").is_err());
        assert!(parse("IJ").is_err());
        assert!(parse("I[").is_err());
        assert!(parse("Ljava/lang/String").is_err());
        assert!(parse("L;").is_err());
    }

    #[test]
    fn md_parse() {
        fn parse(s: &str) -> Result<MethodDescriptor> {
            s.parse()
        }

        assert_eq!(
            parse("()V").unwrap(),
            MethodDescriptor::new(Vec::new(), None)
        );
        assert_eq!(
            parse("()[J").unwrap(),
            MethodDescriptor::new(Vec::new(), Some(TypeDescriptor::new(1, Type::Long)))
        );
        assert_eq!(
            parse("([[Ljava/lang/String;I)V").unwrap(),
            MethodDescriptor::new(
                vec![
                    TypeDescriptor::new(2, Type::Reference("java/lang/String".to_owned())),
                    TypeDescriptor::new(0, Type::Int),
                ],
                None
            )
        );
        assert!(parse("(U)V").is_err());
        assert!(parse("()U").is_err());
        assert!(parse("(V)V").is_err());
        assert!(parse("()IJ").is_err());
        assert!(parse("(I[)V").is_err());
    }
}
