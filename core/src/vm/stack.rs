use core::fmt;

/// A bounded stack.
///
/// Used for both the operand stack and the call-frame stack of the
/// interpreter. Unlike `Vec`, pushing beyond `max_size` fails instead of
/// growing, so runaway programs surface as an error rather than exhausting
/// host memory.
///
/// # Examples
///
/// ```
/// use mathvm_core::vm::Stack;
///
/// let mut stack = Stack::new(2);
/// stack.push(42).unwrap();
/// stack.push(17).unwrap();
/// assert_eq!(stack.push(1), Err(1));
/// assert_eq!(stack.pop(), Some(17));
/// assert_eq!(stack.peek(), Some(&42));
/// ```
pub struct Stack<T> {
    /// The underlying storage for stack elements.
    items: Vec<T>,
    /// Maximum allowed stack size.
    max_size: usize,
}

impl<T> Stack<T> {
    /// Creates a new stack holding at most `max_size` elements.
    ///
    /// Only a small prefix is allocated up front.
    pub fn new(max_size: usize) -> Self {
        let initial_capacity = max_size.min(256);

        Self {
            items: Vec::with_capacity(initial_capacity),
            max_size,
        }
    }

    /// Pushes a value onto the stack.
    ///
    /// Hands the value back when the stack is already full.
    #[inline]
    pub fn push(&mut self, value: T) -> Result<(), T> {
        if self.items.len() >= self.max_size {
            return Err(value);
        }
        self.items.push(value);
        Ok(())
    }

    /// Removes and returns the top value from the stack.
    ///
    /// Returns `None` if the stack is empty.
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    /// Returns a reference to the top value without removing it.
    #[inline]
    pub fn peek(&self) -> Option<&T> {
        self.items.last()
    }

    #[inline]
    pub fn peek_mut(&mut self) -> Option<&mut T> {
        self.items.last_mut()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the maximum number of elements the stack accepts.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.max_size
    }

    #[inline]
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Returns an iterator over the elements, from bottom to top.
    #[inline]
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> {
        self.items.iter()
    }

    /// Returns a mutable iterator over the elements, from bottom to top.
    #[inline]
    pub fn iter_mut(&mut self) -> impl DoubleEndedIterator<Item = &mut T> {
        self.items.iter_mut()
    }
}

impl<T: fmt::Debug> fmt::Debug for Stack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stack")
            .field("len", &self.items.len())
            .field("max_size", &self.max_size)
            .field("items", &self.items)
            .finish()
    }
}
