/// Reminder of the wire layout appended to every parse-class diagnostic.
///
/// Senders that get the framing wrong usually do so systematically, so the
/// reminder spells out each field with its width together with one worked
/// example per operation.
pub const PROTOCOL_USAGE: &str = "\
Make sure you are following this protocol when transferring files.
Transfer protocol:
\tdelete: (operation)(fileNameLength)(fileName)
\tcreate: (operation)(fileNameLength)(fileName)(fileContentLength)(fileContent)
\toperation: exactly 1 byte (7 - delete, 8 - create)
\tfileNameLength: exactly 5 bytes
\tfileName: relative to app folder
\tfileContentLength: exactly 10 bytes
\tfileContent: byte buffer
\tExample delete: 700003./a
\tExample create: 800007./a.txt0000000011fileContent";
