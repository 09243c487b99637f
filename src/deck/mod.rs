/*!
 * Presentation package handling.
 *
 * - `xml`: owned element tree read and written with quick-xml
 * - `package`: the zip package, slide order and notes lookup, atomic save
 * - `slide`: one slide with its notes and the text containers on it
 */

pub mod package;
pub mod slide;
pub mod xml;

pub use package::{DeckPackage, SlidePart};
pub use slide::{ContainerKind, PartKind, Slide, TextContainer};
pub use xml::{XmlDocument, XmlElement, XmlNode};
