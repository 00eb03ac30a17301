//! ODBTP client library error codes.
//!
//! Values follow `odbtp.h`. Every transport-level code maps 1:1 to a fixed
//! interface error message; `Server` means "ask the ODBC layer".

#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProtocolErrorCode {
    None = 0,
    Memory = 1,
    Handle = 2,
    Connect = 3,
    Read = 4,
    Send = 5,
    TimeoutConnect = 6,
    TimeoutRead = 7,
    TimeoutSend = 8,
    Connected = 9,
    Protocol = 10,
    Response = 11,
    MaxQueries = 12,
    ColumnNumber = 13,
    ColumnName = 14,
    FetchRow = 15,
    NotPreparedProc = 16,
    NoParamInfo = 17,
    ParamNumber = 18,
    ParamName = 19,
    ParamBind = 20,
    ParamGet = 21,
    AttrType = 22,
    GetQuery = 23,
    InterfaceFile = 24,
    InterfaceSyntax = 25,
    InterfaceType = 26,
    ConnectStringLength = 27,
    NoSeekCursor = 28,
    SeekRowPosition = 29,
    Detached = 30,
    GetTypeInfo = 31,
    LoadTypes = 32,
    NoRequest = 33,
    FetchedRows = 34,
    Disconnected = 35,
    HostResolve = 36,
    Server = 99,
}

impl ProtocolErrorCode {
    pub fn from_u32(code: u32) -> Option<Self> {
        use ProtocolErrorCode::*;
        let known = match code {
            0 => None,
            1 => Memory,
            2 => Handle,
            3 => Connect,
            4 => Read,
            5 => Send,
            6 => TimeoutConnect,
            7 => TimeoutRead,
            8 => TimeoutSend,
            9 => Connected,
            10 => Protocol,
            11 => Response,
            12 => MaxQueries,
            13 => ColumnNumber,
            14 => ColumnName,
            15 => FetchRow,
            16 => NotPreparedProc,
            17 => NoParamInfo,
            18 => ParamNumber,
            19 => ParamName,
            20 => ParamBind,
            21 => ParamGet,
            22 => AttrType,
            23 => GetQuery,
            24 => InterfaceFile,
            25 => InterfaceSyntax,
            26 => InterfaceType,
            27 => ConnectStringLength,
            28 => NoSeekCursor,
            29 => SeekRowPosition,
            30 => Detached,
            31 => GetTypeInfo,
            32 => LoadTypes,
            33 => NoRequest,
            34 => FetchedRows,
            35 => Disconnected,
            36 => HostResolve,
            99 => Server,
            _ => return Option::None,
        };
        Some(known)
    }

    pub fn code(self) -> u32 {
        self as u32
    }

    /// Fixed interface-error message for transport-level codes. `None` and
    /// `Server` have no fixed message: they are classified elsewhere.
    pub fn interface_message(self) -> Option<&'static str> {
        use ProtocolErrorCode::*;
        let msg = match self {
            None | Server => return Option::None,
            Memory => "Memory error.",
            Handle => "Connection or cursor handle error.",
            Connect => "Connection error.",
            Read => "Read error.",
            Send => "Send error.",
            TimeoutConnect => "Connection timed out.",
            TimeoutRead => "Read timed out.",
            TimeoutSend => "Send timed out.",
            Connected => "Handle is already connected.",
            Protocol => "Protocol error.",
            Response => "Response error.",
            MaxQueries => "Maximum queries exceeded.",
            ColumnNumber => "Column number error.",
            ColumnName => "Column name error.",
            FetchRow => "Error fetching row.",
            NotPreparedProc => "Not a prepared procedure.",
            NoParamInfo => "Missing required parameter info.",
            ParamNumber => "Parameter number error.",
            ParamName => "Parameter name error.",
            ParamBind => "Parameter binding error.",
            ParamGet => "Parameter retrieval error.",
            AttrType => "Attribute type error.",
            GetQuery => "Unable to retrieve query from the server.",
            InterfaceFile => "Unable to open the server interface file.",
            InterfaceSyntax => "Syntax error in the server interface file.",
            InterfaceType => "Unknown interface type in the server interface file.",
            ConnectStringLength => "Connection string length error.",
            NoSeekCursor => "No seek cursor.",
            SeekRowPosition => "Seek row position error.",
            Detached => "Connection has been detached.",
            GetTypeInfo => "Error getting type info.",
            LoadTypes => "Error loading types.",
            NoRequest => "No request.",
            FetchedRows => "Error in fetched rows.",
            Disconnected => "Disconnected from the server.",
            HostResolve => "Cannot resolve host.",
        };
        Some(msg)
    }
}
