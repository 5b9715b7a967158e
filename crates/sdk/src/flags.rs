//! Capability bits, invocation flags, context keys and diagnostic enumerants

use std::ffi::{c_int, c_uint};

use crate::types::CMPIFlags;

// ============================================================================
// Broker capabilities (CMPIBrokerFT::brokerCapabilities)
// ============================================================================

pub const CMPI_MB_BasicRead: c_uint = 0x0000_0001;
pub const CMPI_MB_BasicWrite: c_uint = 0x0000_0003;
pub const CMPI_MB_InstanceManipulation: c_uint = 0x0000_0007;
pub const CMPI_MB_AssociationTraversal: c_uint = 0x0000_0009;
pub const CMPI_MB_QueryExecution: c_uint = 0x0000_0011;
pub const CMPI_MB_QueryNormalization: c_uint = 0x0000_0031;
pub const CMPI_MB_Indications: c_uint = 0x0000_0081;
pub const CMPI_MB_BasicQualifierSupport: c_uint = 0x0000_0047;
pub const CMPI_MB_OSEncapsulationSupport: c_uint = 0x0000_0100;
pub const CMPI_MB_Supports_Extended_Error: c_uint = 0x0000_0200;
pub const CMPI_MB_Logging: c_uint = 0x0000_0400;
pub const CMPI_MB_Tracing: c_uint = 0x0000_0800;
pub const CMPI_MB_PropertyFiltering: c_uint = 0x0000_1000;
pub const CMPI_MB_CodepageConversion: c_uint = 0x0000_2000;

// Legacy aliases
pub const CMPI_MB_Class_0: c_uint = CMPI_MB_BasicRead;
pub const CMPI_MB_Class_1: c_uint = CMPI_MB_BasicWrite;
pub const CMPI_MB_Class_2: c_uint = CMPI_MB_InstanceManipulation;
pub const CMPI_MB_Supports_PropertyMI: c_uint = 0x0000_0100;
pub const CMPI_MB_Supports_IndicationMI: c_uint = 0x0000_0200;
pub const CMPI_MB_Supports_IndicationPolling: c_uint = 0x0000_0400;
pub const CMPI_MB_Supports_QueryNormalization: c_uint = 0x0000_0800;
pub const CMPI_MB_Supports_Qualifier: c_uint = 0x0000_1000;
pub const CMPI_MB_Supports_Schema: c_uint = 0x0000_3000;

// ============================================================================
// Invocation flags (value of the CMPIInvocationFlags context entry)
// ============================================================================

pub const CMPI_FLAG_LocalOnly: CMPIFlags = 1;
pub const CMPI_FLAG_DeepInheritance: CMPIFlags = 2;
pub const CMPI_FLAG_IncludeQualifiers: CMPIFlags = 4;
pub const CMPI_FLAG_IncludeClassOrigin: CMPIFlags = 8;

// ============================================================================
// Well-known context entry names
// ============================================================================

pub const CMPIInitNameSpace: &str = "CMPIInitNameSpace";
pub const CMPIInvocationFlags: &str = "CMPIInvocationFlags";
pub const CMPIPrincipal: &str = "CMPIPrincipal";
pub const CMPIRole: &str = "CMPIRole";
pub const CMPIAcceptLanguage: &str = "CMPIAcceptLanguage";
pub const CMPIContentLanguage: &str = "CMPIContentLanguage";

// ============================================================================
// Logging and tracing
// ============================================================================

pub type CMPISeverity = c_int;
pub const CMPI_SEV_ERROR: CMPISeverity = 1;
pub const CMPI_SEV_INFO: CMPISeverity = 2;
pub const CMPI_SEV_WARNING: CMPISeverity = 3;
pub const CMPI_DEV_DEBUG: CMPISeverity = 4;

pub type CMPILevel = c_int;
pub const CMPI_LEV_INFO: CMPILevel = 1;
pub const CMPI_LEV_WARNING: CMPILevel = 2;
pub const CMPI_LEV_VERBOSE: CMPILevel = 3;

// ============================================================================
// Query expressions
// ============================================================================

pub type CMPIPredOp = c_int;
pub const CMPI_PredOp_Equals: CMPIPredOp = 1;
pub const CMPI_PredOp_NotEquals: CMPIPredOp = 2;
pub const CMPI_PredOp_LessThan: CMPIPredOp = 3;
pub const CMPI_PredOp_GreaterThanOrEquals: CMPIPredOp = 4;
pub const CMPI_PredOp_GreaterThan: CMPIPredOp = 5;
pub const CMPI_PredOp_LessThanOrEquals: CMPIPredOp = 6;
pub const CMPI_PredOp_Isa: CMPIPredOp = 7;
pub const CMPI_PredOp_NotIsa: CMPIPredOp = 8;
pub const CMPI_PredOp_Like: CMPIPredOp = 9;
pub const CMPI_PredOp_NotLike: CMPIPredOp = 10;

/// Disjunction of conjunctions / conjunction of disjunctions
pub type CMPISelectCondType = c_int;
pub const CMPI_COND_DOC: CMPISelectCondType = 0;
pub const CMPI_COND_COD: CMPISelectCondType = 1;

// ============================================================================
// Extended errors (CMPIError)
// ============================================================================

pub type CMPIErrorType = c_int;
pub const UnknownErrorType: CMPIErrorType = 0;
pub const OtherErrorType: CMPIErrorType = 1;
pub const CommunicationsError: CMPIErrorType = 2;
pub const QualityOfServiceError: CMPIErrorType = 3;
pub const SoftwareError: CMPIErrorType = 4;
pub const HardwareError: CMPIErrorType = 5;
pub const EnvironmentalError: CMPIErrorType = 6;
pub const SecurityError: CMPIErrorType = 7;
pub const Oversubscription_Error: CMPIErrorType = 8;
pub const UnavailableResourceError: CMPIErrorType = 9;
pub const UnsupportedOperationError: CMPIErrorType = 10;

pub type CMPIErrorSeverity = c_int;
pub const ErrorSevUnknown: CMPIErrorSeverity = 0;
pub const ErrorSevLow: CMPIErrorSeverity = 2;
pub const ErrorSevMedium: CMPIErrorSeverity = 3;
pub const ErrorSevHigh: CMPIErrorSeverity = 4;
pub const ErrorSevFatal: CMPIErrorSeverity = 5;

pub type CMPIErrorSrcFormat = c_int;
pub const CMPIErrSrcUnknown: CMPIErrorSrcFormat = 0;
pub const CMPIErrSrcOther: CMPIErrorSrcFormat = 1;
pub const CIMObjectHandle: CMPIErrorSrcFormat = 2;

pub type CMPIErrorProbableCause = c_int;
pub const ErrorProbCauseUnknown: CMPIErrorProbableCause = 0;
pub const ErrorProbCauseOther: CMPIErrorProbableCause = 1;
pub const Adapter_Card_Error: CMPIErrorProbableCause = 2;
pub const Application_Subsystem_Failure: CMPIErrorProbableCause = 3;
pub const Bandwidth_Reduced: CMPIErrorProbableCause = 4;
pub const Connection_Establishment_Error: CMPIErrorProbableCause = 5;
pub const Communications_Protocol_Error: CMPIErrorProbableCause = 6;
pub const Communications_Subsystem_Failure: CMPIErrorProbableCause = 7;
pub const ConfigurationCustomization_Error: CMPIErrorProbableCause = 8;
pub const Congestion: CMPIErrorProbableCause = 9;
pub const Corrupt_Data: CMPIErrorProbableCause = 10;
pub const CPU_Cycles_Limit_Exceeded: CMPIErrorProbableCause = 11;
pub const DatasetModem_Error: CMPIErrorProbableCause = 12;
pub const Degraded_Signal: CMPIErrorProbableCause = 13;
pub const DTE_DCE_Interface_Error: CMPIErrorProbableCause = 14;
pub const Enclosure_Door_Open: CMPIErrorProbableCause = 15;
pub const Equipment_Malfunction: CMPIErrorProbableCause = 16;
pub const Excessive_Vibration: CMPIErrorProbableCause = 17;
pub const File_Format_Error: CMPIErrorProbableCause = 18;
pub const Fire_Detected: CMPIErrorProbableCause = 19;
pub const Flood_Detected: CMPIErrorProbableCause = 20;
pub const Framing_Error: CMPIErrorProbableCause = 21;
pub const HVAC_Problem: CMPIErrorProbableCause = 22;
pub const Humidity_Unacceptable: CMPIErrorProbableCause = 23;
pub const IO_Device_Error: CMPIErrorProbableCause = 24;
pub const Input_Device_Error: CMPIErrorProbableCause = 25;
pub const LAN_Error: CMPIErrorProbableCause = 26;
pub const Non_Toxic_Leak_Detected: CMPIErrorProbableCause = 27;
pub const Local_Node_Transmission_Error: CMPIErrorProbableCause = 28;
pub const Loss_of_Frame: CMPIErrorProbableCause = 29;
pub const Loss_of_Signal: CMPIErrorProbableCause = 30;
pub const Material_Supply_Exhausted: CMPIErrorProbableCause = 31;
pub const Multiplexer_Problem: CMPIErrorProbableCause = 32;
pub const Out_of_Memory: CMPIErrorProbableCause = 33;
pub const Output_Device_Error: CMPIErrorProbableCause = 34;
pub const Performance_Degraded: CMPIErrorProbableCause = 35;
pub const Power_Problem: CMPIErrorProbableCause = 36;
pub const Pressure_Unacceptable: CMPIErrorProbableCause = 37;
pub const Processor_Problem: CMPIErrorProbableCause = 38;
pub const Pump_Failure: CMPIErrorProbableCause = 39;
pub const Queue_Size_Exceeded: CMPIErrorProbableCause = 40;
pub const Receive_Failure: CMPIErrorProbableCause = 41;
pub const Receiver_Failure: CMPIErrorProbableCause = 42;
pub const Remote_Node_Transmission_Error: CMPIErrorProbableCause = 43;
pub const Resource_at_or_Nearing_Capacity: CMPIErrorProbableCause = 44;
pub const Response_Time_Excessive: CMPIErrorProbableCause = 45;
pub const Retransmission_Rate_Excessive: CMPIErrorProbableCause = 46;
pub const Software_Error: CMPIErrorProbableCause = 47;
pub const Software_Program_Abnormally_Terminated: CMPIErrorProbableCause = 48;
pub const Software_Program_Error: CMPIErrorProbableCause = 49;
pub const Storage_Capacity_Problem: CMPIErrorProbableCause = 50;
pub const Temperature_Unacceptable: CMPIErrorProbableCause = 51;
pub const Threshold_Crossed: CMPIErrorProbableCause = 52;
pub const Timing_Problem: CMPIErrorProbableCause = 53;
pub const Toxic_Leak_Detected: CMPIErrorProbableCause = 54;
pub const Transmit_Failure: CMPIErrorProbableCause = 55;
pub const Transmitter_Failure: CMPIErrorProbableCause = 56;
pub const Underlying_Resource_Unavailable: CMPIErrorProbableCause = 57;
pub const Version_Mismatch: CMPIErrorProbableCause = 58;
pub const Previous_Alert_Cleared: CMPIErrorProbableCause = 59;
pub const Login_Attempts_Failed: CMPIErrorProbableCause = 60;
pub const Software_Virus_Detected: CMPIErrorProbableCause = 61;
pub const Hardware_Security_Breached: CMPIErrorProbableCause = 62;
pub const Denial_of_Service_Detected: CMPIErrorProbableCause = 63;
pub const Security_Credential_Mismatch: CMPIErrorProbableCause = 64;
pub const Unauthorized_Access: CMPIErrorProbableCause = 65;
pub const Alarm_Received: CMPIErrorProbableCause = 66;
pub const Loss_of_Pointer: CMPIErrorProbableCause = 67;
pub const Payload_Mismatch: CMPIErrorProbableCause = 68;
pub const Transmission_Error: CMPIErrorProbableCause = 69;
pub const Excessive_Error_Rate: CMPIErrorProbableCause = 70;
pub const Trace_Problem: CMPIErrorProbableCause = 71;
pub const Element_Unavailable: CMPIErrorProbableCause = 72;
pub const Element_Missing: CMPIErrorProbableCause = 73;
pub const Loss_of_Multi_Frame: CMPIErrorProbableCause = 74;
pub const Broadcast_Channel_Failure: CMPIErrorProbableCause = 75;
pub const Invalid_Message_Received: CMPIErrorProbableCause = 76;
pub const Routing_Failure: CMPIErrorProbableCause = 77;
pub const Backplane_Failure: CMPIErrorProbableCause = 78;
pub const Identifier_Duplication: CMPIErrorProbableCause = 79;
pub const Protection_Path_Failure: CMPIErrorProbableCause = 80;
pub const Sync_Loss_or_Mismatch: CMPIErrorProbableCause = 81;
pub const Terminal_Problem: CMPIErrorProbableCause = 82;
pub const Real_Time_Clock_Failure: CMPIErrorProbableCause = 83;
pub const Antenna_Failure: CMPIErrorProbableCause = 84;
pub const Battery_Charging_Failure: CMPIErrorProbableCause = 85;
pub const Disk_Failure: CMPIErrorProbableCause = 86;
pub const Frequency_Hopping_Failure: CMPIErrorProbableCause = 87;
pub const Loss_of_Redundancy: CMPIErrorProbableCause = 88;
pub const Power_Supply_Failure: CMPIErrorProbableCause = 89;
pub const Signal_Quality_Problem: CMPIErrorProbableCause = 90;
pub const Battery_Discharging: CMPIErrorProbableCause = 91;
pub const Battery_Failure: CMPIErrorProbableCause = 92;
pub const Commercial_Power_Problem: CMPIErrorProbableCause = 93;
pub const Fan_Failure: CMPIErrorProbableCause = 94;
pub const Engine_Failure: CMPIErrorProbableCause = 95;
pub const Sensor_Failure: CMPIErrorProbableCause = 96;
pub const Fuse_Failure: CMPIErrorProbableCause = 97;
pub const Generator_Failure: CMPIErrorProbableCause = 98;
pub const Low_Battery: CMPIErrorProbableCause = 99;
pub const Low_Fuel: CMPIErrorProbableCause = 100;
pub const Low_Water: CMPIErrorProbableCause = 101;
pub const Explosive_Gas: CMPIErrorProbableCause = 102;
pub const High_Winds: CMPIErrorProbableCause = 103;
pub const Ice_Buildup: CMPIErrorProbableCause = 104;
pub const Smoke: CMPIErrorProbableCause = 105;
pub const Memory_Mismatch: CMPIErrorProbableCause = 106;
pub const Out_of_CPU_Cycles: CMPIErrorProbableCause = 107;
pub const Software_Environment_Problem: CMPIErrorProbableCause = 108;
pub const Software_Download_Failure: CMPIErrorProbableCause = 109;
pub const Element_Reinitialized: CMPIErrorProbableCause = 110;
pub const Timeout: CMPIErrorProbableCause = 111;
pub const Logging_Problems: CMPIErrorProbableCause = 112;
pub const Leak_Detected: CMPIErrorProbableCause = 113;
pub const Protection_Mechanism_Failure: CMPIErrorProbableCause = 114;
pub const Protecting_Resource_Failure: CMPIErrorProbableCause = 115;
pub const Database_Inconsistency: CMPIErrorProbableCause = 116;
pub const Authentication_Failure: CMPIErrorProbableCause = 117;
pub const Breach_of_Confidentiality: CMPIErrorProbableCause = 118;
pub const Cable_Tamper: CMPIErrorProbableCause = 119;
pub const Delayed_Information: CMPIErrorProbableCause = 120;
pub const Duplicate_Information: CMPIErrorProbableCause = 121;
pub const Information_Missing: CMPIErrorProbableCause = 122;
pub const Information_Modification: CMPIErrorProbableCause = 123;
pub const Information_Out_of_Sequence: CMPIErrorProbableCause = 124;
pub const Key_Expired: CMPIErrorProbableCause = 125;
pub const Non_Repudiation_Failure: CMPIErrorProbableCause = 126;
pub const Out_of_Hours_Activity: CMPIErrorProbableCause = 127;
pub const Out_of_Service: CMPIErrorProbableCause = 128;
pub const Procedural_Error: CMPIErrorProbableCause = 129;
pub const Unexpected_Information: CMPIErrorProbableCause = 130;

// ============================================================================
// Codepages
// ============================================================================

pub type CMPICodepageID = c_int;
pub const CMPI_CPID_SYSTEM: CMPICodepageID = -1;
pub const CMPI_CPID_UTF8: CMPICodepageID = 1208;
pub const CMPI_CPID_UTF16: CMPICodepageID = 1202;
