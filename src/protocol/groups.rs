use std::io::{Read, Write};

use crate::codecs::{FromByte, ToByte};
use crate::error::Result;

use super::{HeaderRequest, HeaderResponse};
use super::{API_KEY_LIST_GROUPS, API_VERSION_LIST_GROUPS};

/// https://kafka.apache.org/protocol.html#The_Messages_ListGroups (v0)
#[derive(Debug)]
pub struct ListGroupsRequest<'a> {
    pub header: HeaderRequest<'a>,
}

impl<'a> ListGroupsRequest<'a> {
    pub fn new(correlation_id: i32, client_id: &'a str) -> ListGroupsRequest<'a> {
        ListGroupsRequest {
            header: HeaderRequest::new(
                API_KEY_LIST_GROUPS,
                API_VERSION_LIST_GROUPS,
                correlation_id,
                client_id,
            ),
        }
    }
}

impl<'a> ToByte for ListGroupsRequest<'a> {
    fn encode<W: Write>(&self, buffer: &mut W) -> Result<()> {
        self.header.encode(buffer)
    }
}

// --------------------------------------------------------------------

#[derive(Default, Debug)]
pub struct ListGroupsResponse {
    pub header: HeaderResponse,
    pub error: i16,
    pub groups: Vec<ListedGroup>,
}

#[derive(Default, Debug)]
pub struct ListedGroup {
    pub group_id: String,
    pub protocol_type: String,
}

impl FromByte for ListGroupsResponse {
    type R = ListGroupsResponse;

    fn decode<T: Read>(&mut self, buffer: &mut T) -> Result<()> {
        try_multi!(
            self.header.decode(buffer),
            self.error.decode(buffer),
            self.groups.decode(buffer)
        )
    }
}

impl FromByte for ListedGroup {
    type R = ListedGroup;

    fn decode<T: Read>(&mut self, buffer: &mut T) -> Result<()> {
        try_multi!(
            self.group_id.decode(buffer),
            self.protocol_type.decode(buffer)
        )
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn test_encode_request() {
        let mut buf = Vec::new();
        ListGroupsRequest::new(5, "c").encode(&mut buf).unwrap();
        assert_eq!(buf, [0, 16, 0, 0, 0, 0, 0, 5, 0, 1, b'c']);
    }

    #[test]
    fn test_decode_response() {
        #[rustfmt::skip]
        let data: Vec<u8> = vec![
            0, 0, 0, 5,
            0, 0,
            0, 0, 0, 2,
            0, 4, b'g', b'r', b'p', b'1', 0, 8, b'c', b'o', b'n', b's', b'u', b'm', b'e', b'r',
            0, 4, b'g', b'r', b'p', b'2', 0, 0,
        ];
        let resp = ListGroupsResponse::decode_new(&mut Cursor::new(data)).unwrap();
        assert_eq!(5, resp.header.correlation);
        assert_eq!(0, resp.error);
        assert_eq!(2, resp.groups.len());
        assert_eq!("grp1", resp.groups[0].group_id);
        assert_eq!("consumer", resp.groups[0].protocol_type);
        assert_eq!("", resp.groups[1].protocol_type);
    }
}
