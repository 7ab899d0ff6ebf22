//! The generic transform-chain primitive behind every `*Transform` in
//! the façade crate: a downstream sink that a transform function feeds
//! zero or more times per incoming element.
//!
//! Nothing like this exists upstream — the original crate has no
//! transform engine at all, it only round-trips. This is new
//! engineering. It is
//! intentionally generic over the element type `E` rather than tied to
//! `element::CodeElement` or a future `ClassElement`, since the same
//! "wrap a downstream builder, let the transform decide what and how
//! many times to forward" shape applies at the class, method and code
//! level alike; `classfile::transform` specializes it per level.

/// A sink elements are pushed into one at a time. Implemented by every
/// builder level (class, method, code) in the façade crate; `with`
/// mutates the builder's own state (appending to the constant pool,
/// buffering an instruction, etc).
pub trait Builder<E> {
    fn with(&mut self, element: E);
}

/// A `Builder` that only ever collects what it is given, unchanged.
/// The simplest possible terminal builder; used directly by tests and
/// as the base case a chain of `TransformingBuilder`s bottoms out on.
#[derive(Debug, Default)]
pub struct CollectingBuilder<E> {
    pub elements: Vec<E>,
}

impl<E> CollectingBuilder<E> {
    pub fn new() -> CollectingBuilder<E> {
        CollectingBuilder { elements: Vec::new() }
    }
}

impl<E> Builder<E> for CollectingBuilder<E> {
    fn with(&mut self, element: E) {
        self.elements.push(element);
    }
}

/// Wraps a downstream `Builder` behind a transform function. Every
/// element pushed into this builder is handed to `transform` along
/// with a reference to the downstream builder; `transform` decides
/// whether, how, and how many times to forward it downstream by
/// calling `downstream.with(..)` itself. The default transform
/// (`pass_through`) forwards the element unchanged exactly once.
pub struct TransformingBuilder<'d, E, D: Builder<E> + ?Sized> {
    downstream: &'d mut D,
    transform: Box<dyn FnMut(&mut D, E) + 'd>,
}

impl<'d, E, D: Builder<E> + ?Sized> TransformingBuilder<'d, E, D> {
    pub fn new(downstream: &'d mut D, transform: impl FnMut(&mut D, E) + 'd) -> TransformingBuilder<'d, E, D> {
        TransformingBuilder {
            downstream,
            transform: Box::new(transform),
        }
    }

    /// A chain stage that forwards every element unchanged — the
    /// identity transform every `*Transform` trait defaults to.
    pub fn pass_through(downstream: &'d mut D) -> TransformingBuilder<'d, E, D>
    where
        D: Builder<E>,
        E: 'd,
    {
        TransformingBuilder::new(downstream, |d, e| d.with(e))
    }
}

impl<'d, E, D: Builder<E> + ?Sized> Builder<E> for TransformingBuilder<'d, E, D> {
    fn with(&mut self, element: E) {
        let TransformingBuilder { downstream, transform } = self;
        (transform)(downstream, element);
    }
}

/// Runs a full element stream through a builder, in order. The glue
/// between `element::elements_of`/`assembler::AsmElement` and a chain
/// of `TransformingBuilder`s.
pub fn drive<E>(elements: impl IntoIterator<Item = E>, builder: &mut dyn Builder<E>) {
    for element in elements {
        builder.with(element);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pass_through_forwards_every_element_once() {
        let mut sink = CollectingBuilder::new();
        {
            let mut chain = TransformingBuilder::pass_through(&mut sink);
            drive([1, 2, 3], &mut chain);
        }
        assert_eq!(sink.elements, vec![1, 2, 3]);
    }

    #[test]
    fn a_transform_may_drop_elements() {
        let mut sink = CollectingBuilder::new();
        {
            let mut chain = TransformingBuilder::new(&mut sink, |d, e: i32| {
                if e % 2 == 0 {
                    d.with(e);
                }
            });
            drive([1, 2, 3, 4, 5], &mut chain);
        }
        assert_eq!(sink.elements, vec![2, 4]);
    }

    #[test]
    fn a_transform_may_duplicate_elements() {
        let mut sink = CollectingBuilder::new();
        {
            let mut chain = TransformingBuilder::new(&mut sink, |d, e: i32| {
                d.with(e);
                d.with(e);
            });
            drive([1, 2], &mut chain);
        }
        assert_eq!(sink.elements, vec![1, 1, 2, 2]);
    }

    #[test]
    fn chains_compose_tail_to_head() {
        let mut sink = CollectingBuilder::new();
        {
            let mut inner = TransformingBuilder::new(&mut sink, |d, e: i32| d.with(e * 10));
            let mut outer = TransformingBuilder::new(&mut inner, |d, e: i32| d.with(e + 1));
            drive([1, 2], &mut outer);
        }
        assert_eq!(sink.elements, vec![20, 30]);
    }
}
