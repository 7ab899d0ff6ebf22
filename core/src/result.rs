use std::result;

/// All errors that can occur while decoding, encoding or assembling
/// a class file.
#[derive(Debug, YadeError)]
pub enum Error {
    /// The byte stream ended, or a length-prefixed region was exceeded,
    /// before a read completed.
    LimitExceeded,

    /// Not a class file: the header does not equal `0xCAFEBABE`.
    NotAClass,

    /// A constant pool entry could not be decoded (unknown tag) or
    /// an index pointed at a slot of the wrong kind.
    InvalidCPItem(u16),

    /// A modified UTF-8 string could not be decoded.
    InvalidUTF8,

    /// The constant pool cannot be larger than `u16::max_value()`.
    CPTooLarge,

    /// An unknown or malformed opcode was encountered while decoding
    /// a `Code` attribute, at the given bci.
    InvalidInstruction { op_code: u8, at: u32 },

    /// A reserved (invalid) stack map frame tag.
    ReservedStackMapFrame(u8),

    /// An invalid verification type tag in a `StackMapTable`.
    InvalidVerificationType(u8),

    /// An invalid element value tag in an annotation.
    InvalidElementValue(u8),

    /// An invalid target type tag in a type annotation.
    InvalidTargetType,

    /// An invalid type path element kind in a type annotation.
    InvalidTypePath,

    /// A label was referenced by a branch, an exception handler, or a
    /// debug-info entry but was never bound to a bci, and the active
    /// `DeadLabels` policy is `FailOnDeadLabels`.
    DeadLabel,

    /// A label was looked up before it was bound.
    UnboundLabel,

    /// A label was bound twice, to two different bcis.
    LabelAlreadyBound,

    /// A branch needed widening past the 16-bit short-jump form, and the
    /// active `ShortJumps` policy is `FailOnShortJumps`.
    ShortJumpOverflow,

    /// The sizing fixpoint used to resolve branch widenings did not
    /// converge within the iteration cap.
    FixupDidNotConverge,

    /// Unreachable bytecode was found and the active `DeadCode` policy
    /// is `FailOnDeadCode`.
    DeadCode,

    /// The code array, or some length-prefixed table within it, exceeds
    /// the 16- or 32-bit width the class file format allows for it.
    CodeTooLarge,

    /// A builder was used after it was already consumed.
    BuilderAlreadyConsumed,

    /// A value supplied to a builder is out of range for its encoding
    /// (e.g. a negative local-variable slot, or an operand that does not
    /// fit any encoding of the requested opcode).
    IllegalArgument(&'static str),
}

pub type Result<T> = result::Result<T, Error>;
