use std::cell::{Ref, RefCell};
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::mem;
use std::rc::{Rc, Weak};

struct InnerDir<T> {
    payload: Option<T>,
    children: BTreeMap<String, Node<T>>,
}

// dropping a deep subtree must not recurse once per level
impl<T> Drop for InnerDir<T> {
    fn drop(&mut self) {
        let mut pending: Vec<Node<T>> = mem::take(&mut self.children).into_values().collect();

        while let Some(node) = pending.pop() {
            if let Node::Dir(dir) = node {
                if Rc::strong_count(&dir.0) == 1 {
                    pending.extend(mem::take(&mut dir.0.borrow_mut().children).into_values());
                }
            }
        }
    }
}

/// A directory handle.
///
/// Cloning a `Dir` clones the handle, not the directory: both handles refer to the same
/// children map, and [`Dir::ptr_eq`] tells them apart from a distinct directory.
pub struct Dir<T>(Rc<RefCell<InnerDir<T>>>);

impl<T> Dir<T> {
    pub fn new(payload: Option<T>) -> Self {
        Dir(Rc::new(RefCell::new(InnerDir {
            payload,
            children: BTreeMap::new(),
        })))
    }

    /// Names of the current children, sorted.
    pub fn list_children(&self) -> Vec<String> {
        self.0.borrow().children.keys().cloned().collect()
    }

    pub fn get_child(&self, name: &str) -> Option<Node<T>> {
        self.0.borrow().children.get(name).cloned()
    }

    /// Insert `node` under `name`. Returns false and leaves the directory untouched if a
    /// child with that name already exists.
    pub fn add_child(&self, name: &str, node: Node<T>) -> bool {
        let mut inner_dir = self.0.borrow_mut();

        if inner_dir.children.contains_key(name) {
            return false;
        }

        inner_dir.children.insert(name.to_owned(), node);

        true
    }

    pub fn remove_child(&self, name: &str) -> Option<Node<T>> {
        self.0.borrow_mut().children.remove(name)
    }

    pub fn payload(&self) -> Ref<'_, Option<T>> {
        Ref::map(self.0.borrow(), |inner_dir| &inner_dir.payload)
    }

    pub fn set_payload(&self, payload: Option<T>) -> Option<T> {
        mem::replace(&mut self.0.borrow_mut().payload, payload)
    }

    pub fn len(&self) -> usize {
        self.0.borrow().children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().children.is_empty()
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn downgrade(&self) -> WeakDir<T> {
        WeakDir(Rc::downgrade(&self.0))
    }
}

impl<T> Clone for Dir<T> {
    fn clone(&self) -> Self {
        Dir(self.0.clone())
    }
}

impl<T: Debug> Debug for Dir<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let inner_dir = self.0.borrow();

        f.debug_struct("Dir")
            .field("payload", &inner_dir.payload)
            .field("children", &inner_dir.children)
            .finish()
    }
}

/// Non-owning directory handle, what the index keeps per registered path.
pub(crate) struct WeakDir<T>(Weak<RefCell<InnerDir<T>>>);

impl<T> WeakDir<T> {
    pub(crate) fn upgrade(&self) -> Option<Dir<T>> {
        self.0.upgrade().map(Dir)
    }
}

pub struct File<T>(Rc<RefCell<T>>);

impl<T> File<T> {
    pub fn new(payload: T) -> Self {
        File(Rc::new(RefCell::new(payload)))
    }

    pub fn payload(&self) -> Ref<'_, T> {
        self.0.borrow()
    }

    /// Replace the payload, returning the previous one.
    pub fn set_payload(&self, payload: T) -> T {
        self.0.replace(payload)
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Clone for File<T> {
    fn clone(&self) -> Self {
        File(self.0.clone())
    }
}

impl<T: Debug> Debug for File<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("File").field(&*self.0.borrow()).finish()
    }
}

#[derive(Debug)]
pub enum Node<T> {
    File(File<T>),
    Dir(Dir<T>),
}

impl<T> Node<T> {
    #[inline]
    pub fn is_file(&self) -> bool {
        matches!(*self, Node::File(_))
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        !self.is_file()
    }

    pub fn as_dir(&self) -> Option<&Dir<T>> {
        match self {
            Node::Dir(dir) => Some(dir),
            Node::File(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&File<T>> {
        match self {
            Node::File(file) => Some(file),
            Node::Dir(_) => None,
        }
    }

    /// Whether both nodes are handles to the same underlying file or directory.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Node::Dir(dir), Node::Dir(other)) => dir.ptr_eq(other),
            (Node::File(file), Node::File(other)) => file.ptr_eq(other),
            _ => false,
        }
    }
}

impl<T> Clone for Node<T> {
    fn clone(&self) -> Self {
        match self {
            Node::File(file) => Node::File(file.clone()),
            Node::Dir(dir) => Node::Dir(dir.clone()),
        }
    }
}

impl<T> From<Dir<T>> for Node<T> {
    fn from(dir: Dir<T>) -> Self {
        Node::Dir(dir)
    }
}

impl<T> From<&Dir<T>> for Node<T> {
    fn from(dir: &Dir<T>) -> Self {
        Node::Dir(dir.clone())
    }
}

impl<T> From<File<T>> for Node<T> {
    fn from(file: File<T>) -> Self {
        Node::File(file)
    }
}

impl<T> From<&File<T>> for Node<T> {
    fn from(file: &File<T>) -> Self {
        Node::File(file.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_child() {
        let dir = Dir::<u32>::new(None);

        assert!(dir.is_empty());
        assert!(dir.add_child("a", Node::from(File::new(1))));
        assert!(dir.add_child("b", Node::from(Dir::new(None))));

        assert_eq!(dir.len(), 2);
        assert_eq!(dir.list_children(), vec!["a".to_owned(), "b".to_owned()]);
    }

    #[test]
    fn add_child_conflict() {
        let dir = Dir::new(None);
        let file = File::new(1);

        assert!(dir.add_child("a", Node::from(&file)));
        assert!(!dir.add_child("a", Node::from(File::new(2))));

        let child = dir.get_child("a").unwrap();

        assert!(child.as_file().unwrap().ptr_eq(&file));
        assert_eq!(*child.as_file().unwrap().payload(), 1);
    }

    #[test]
    fn remove_child() {
        let dir = Dir::new(None);

        dir.add_child("a", Node::from(File::new(1)));

        let removed = dir.remove_child("a").unwrap();

        assert!(removed.is_file());
        assert!(dir.get_child("a").is_none());
        assert!(dir.remove_child("a").is_none());
        assert!(dir.list_children().is_empty());
    }

    #[test]
    fn payload() {
        let file = File::new(1);

        assert_eq!(file.set_payload(2), 1);
        assert_eq!(*file.payload(), 2);

        let dir = Dir::new(None);

        assert!(dir.payload().is_none());
        assert_eq!(dir.set_payload(Some(7)), None);
        assert_eq!(*dir.payload(), Some(7));
    }

    #[test]
    fn node_kind() {
        let dir = Node::from(Dir::<()>::new(None));
        let file = Node::from(File::new(()));

        assert!(dir.is_dir());
        assert!(!dir.is_file());
        assert!(dir.as_dir().is_some());
        assert!(dir.as_file().is_none());

        assert!(file.is_file());
        assert!(file.as_file().is_some());
        assert!(!file.ptr_eq(&dir));
        assert!(dir.ptr_eq(&dir.clone()));
    }

    #[test]
    fn weak_dir_does_not_own() {
        let dir = Dir::<()>::new(None);
        let weak = dir.downgrade();

        assert!(weak.upgrade().unwrap().ptr_eq(&dir));

        drop(dir);

        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn drop_deep_tree() {
        let root = Dir::<()>::new(None);
        let mut parent = root.clone();

        for _ in 0..100_000 {
            let child = Dir::new(None);

            parent.add_child("d", Node::from(&child));
            parent = child;
        }

        drop(parent);
        drop(root);
    }
}
