//! Broker handle: up-calls, object factories, OS services and memory

use std::ffi::{c_char, c_void, CStr};
use std::ptr::{self, NonNull};

use crate::datetime::CimDateTime;
use crate::flags::Capabilities;
use crate::handles::{
    c_arg, c_opt, call_rc, opt_ptr, ArgsRef, ArrayRef, ContextRef, DateTimeRef, EnumerationRef,
    ErrorRef, InstanceRef, ObjectPathRef, PropertyListRef, SelectExpRef, StringRef,
};
use crate::sdk::*;
use crate::status::{CmpiError, CmpiResult};
use crate::value::raw::{data_from_raw, data_to_raw, PropertyNames};
use crate::value::{ArrayData, Data, ErrorData, InstanceData, ObjectPathData, Value};

/// The broker a provider was created by
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct BrokerHandle {
    raw: NonNull<CMPIBroker>,
}

// SAFETY: the broker outlives every provider it creates and its tables are
// callable from any attached thread.
unsafe impl Send for BrokerHandle {}
unsafe impl Sync for BrokerHandle {}

impl std::fmt::Debug for BrokerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerHandle")
            .field("raw", &self.raw)
            .field("name", &self.name())
            .finish()
    }
}

/// Token returned by [`BrokerHandle::mark`]
#[derive(Debug)]
#[must_use = "pass the mark back to BrokerHandle::release_mark"]
pub struct GcMark(*mut CMPIGcStat);

impl BrokerHandle {
    /// # Safety
    /// `mb` must be null or a broker with valid tables that outlives the handle.
    pub unsafe fn from_raw(mb: *const CMPIBroker) -> CmpiResult<Self> {
        match NonNull::new(mb as *mut CMPIBroker) {
            Some(raw) if !(*mb).bft.is_null() && !(*mb).eft.is_null() => Ok(Self { raw }),
            _ => Err(CmpiError::invalid_handle("broker")),
        }
    }

    pub fn as_ptr(&self) -> *const CMPIBroker {
        self.raw.as_ptr()
    }

    fn bft(&self) -> &CMPIBrokerFT {
        // SAFETY: checked in from_raw
        unsafe { &*(*self.raw.as_ptr()).bft }
    }

    fn eft(&self) -> &CMPIBrokerEncFT {
        // SAFETY: checked in from_raw
        unsafe { &*(*self.raw.as_ptr()).eft }
    }

    fn xft(&self) -> CmpiResult<&CMPIBrokerExtFT> {
        // SAFETY: live broker envelope
        unsafe {
            let p = (*self.raw.as_ptr()).xft;
            p.as_ref().ok_or_else(CmpiError::not_supported)
        }
    }

    fn mft(&self) -> CmpiResult<&CMPIBrokerMemFT> {
        // SAFETY: live broker envelope
        unsafe {
            let p = (*self.raw.as_ptr()).mft;
            p.as_ref().ok_or_else(CmpiError::not_supported)
        }
    }

    // ------------------------------------------------------------------------
    // Identification
    // ------------------------------------------------------------------------

    pub fn capabilities(&self) -> Capabilities {
        Capabilities::from_bits_retain(self.bft().brokerCapabilities)
    }

    pub fn version(&self) -> CMPIVersion {
        self.bft().brokerVersion
    }

    pub fn name(&self) -> String {
        let p = self.bft().brokerName;
        if p.is_null() {
            String::new()
        } else {
            // SAFETY: brokerName is a static NUL-terminated string
            unsafe { CStr::from_ptr(p).to_string_lossy().into_owned() }
        }
    }

    // ------------------------------------------------------------------------
    // Thread registration
    // ------------------------------------------------------------------------

    /// Context for a thread about to be started by the provider
    pub fn prepare_attach_thread(&self, ctx: &ContextRef) -> CmpiResult<ContextRef> {
        // SAFETY: live broker and context
        unsafe {
            let p = (self.bft().prepareAttachThread)(self.as_ptr(), ctx.as_ptr());
            if p.is_null() {
                return Err(CmpiError::failed("prepareAttachThread returned no context"));
            }
            ContextRef::from_raw(p, *self)
        }
    }

    pub fn attach_thread(&self, ctx: &ContextRef) -> CmpiResult<()> {
        unsafe { CmpiError::check((self.bft().attachThread)(self.as_ptr(), ctx.as_ptr())) }
    }

    pub fn detach_thread(&self, ctx: &ContextRef) -> CmpiResult<()> {
        unsafe { CmpiError::check((self.bft().detachThread)(self.as_ptr(), ctx.as_ptr())) }
    }

    pub fn deliver_indication(&self, ctx: &ContextRef, namespace: &str, ind: &InstanceRef) -> CmpiResult<()> {
        let ns = c_arg(namespace)?;
        unsafe {
            CmpiError::check((self.bft().deliverIndication)(
                self.as_ptr(),
                ctx.as_ptr(),
                ns.as_ptr(),
                ind.as_ptr(),
            ))
        }
    }

    // ------------------------------------------------------------------------
    // Up-calls
    // ------------------------------------------------------------------------

    fn enumeration(&self, p: *mut CMPIEnumeration) -> CmpiResult<EnumerationRef> {
        unsafe { EnumerationRef::from_raw(p, *self) }
    }

    pub fn enumerate_instance_names(
        &self,
        ctx: &ContextRef,
        class_path: &ObjectPathRef,
    ) -> CmpiResult<EnumerationRef> {
        let p = unsafe {
            call_rc(|rc| (self.bft().enumerateInstanceNames)(self.as_ptr(), ctx.as_ptr(), class_path.as_ptr(), rc))?
        };
        self.enumeration(p)
    }

    pub fn enumerate_instances(
        &self,
        ctx: &ContextRef,
        class_path: &ObjectPathRef,
        properties: Option<&[&str]>,
    ) -> CmpiResult<EnumerationRef> {
        let props = PropertyNames::new(properties)?;
        let p = unsafe {
            call_rc(|rc| {
                (self.bft().enumerateInstances)(self.as_ptr(), ctx.as_ptr(), class_path.as_ptr(), props.as_ptr(), rc)
            })?
        };
        self.enumeration(p)
    }

    pub fn get_instance(
        &self,
        ctx: &ContextRef,
        path: &ObjectPathRef,
        properties: Option<&[&str]>,
    ) -> CmpiResult<InstanceRef> {
        let props = PropertyNames::new(properties)?;
        unsafe {
            let p = call_rc(|rc| {
                (self.bft().getInstance)(self.as_ptr(), ctx.as_ptr(), path.as_ptr(), props.as_ptr(), rc)
            })?;
            InstanceRef::from_raw(p, *self)
        }
    }

    pub fn create_instance(
        &self,
        ctx: &ContextRef,
        class_path: &ObjectPathRef,
        inst: &InstanceRef,
    ) -> CmpiResult<ObjectPathRef> {
        unsafe {
            let p = call_rc(|rc| {
                (self.bft().createInstance)(self.as_ptr(), ctx.as_ptr(), class_path.as_ptr(), inst.as_ptr(), rc)
            })?;
            ObjectPathRef::from_raw(p, *self)
        }
    }

    pub fn modify_instance(
        &self,
        ctx: &ContextRef,
        path: &ObjectPathRef,
        inst: &InstanceRef,
        properties: Option<&[&str]>,
    ) -> CmpiResult<()> {
        let props = PropertyNames::new(properties)?;
        unsafe {
            CmpiError::check((self.bft().modifyInstance)(
                self.as_ptr(),
                ctx.as_ptr(),
                path.as_ptr(),
                inst.as_ptr(),
                props.as_ptr(),
            ))
        }
    }

    pub fn delete_instance(&self, ctx: &ContextRef, path: &ObjectPathRef) -> CmpiResult<()> {
        unsafe { CmpiError::check((self.bft().deleteInstance)(self.as_ptr(), ctx.as_ptr(), path.as_ptr())) }
    }

    pub fn exec_query(
        &self,
        ctx: &ContextRef,
        class_path: &ObjectPathRef,
        query: &str,
        language: &str,
    ) -> CmpiResult<EnumerationRef> {
        let (q, l) = (c_arg(query)?, c_arg(language)?);
        let p = unsafe {
            call_rc(|rc| {
                (self.bft().execQuery)(self.as_ptr(), ctx.as_ptr(), class_path.as_ptr(), q.as_ptr(), l.as_ptr(), rc)
            })?
        };
        self.enumeration(p)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn associators(
        &self,
        ctx: &ContextRef,
        path: &ObjectPathRef,
        assoc_class: Option<&str>,
        result_class: Option<&str>,
        role: Option<&str>,
        result_role: Option<&str>,
        properties: Option<&[&str]>,
    ) -> CmpiResult<EnumerationRef> {
        let (ac, rc_, r, rr) = (c_opt(assoc_class)?, c_opt(result_class)?, c_opt(role)?, c_opt(result_role)?);
        let props = PropertyNames::new(properties)?;
        let p = unsafe {
            call_rc(|rc| {
                (self.bft().associators)(
                    self.as_ptr(),
                    ctx.as_ptr(),
                    path.as_ptr(),
                    opt_ptr(&ac),
                    opt_ptr(&rc_),
                    opt_ptr(&r),
                    opt_ptr(&rr),
                    props.as_ptr(),
                    rc,
                )
            })?
        };
        self.enumeration(p)
    }

    pub fn associator_names(
        &self,
        ctx: &ContextRef,
        path: &ObjectPathRef,
        assoc_class: Option<&str>,
        result_class: Option<&str>,
        role: Option<&str>,
        result_role: Option<&str>,
    ) -> CmpiResult<EnumerationRef> {
        let (ac, rc_, r, rr) = (c_opt(assoc_class)?, c_opt(result_class)?, c_opt(role)?, c_opt(result_role)?);
        let p = unsafe {
            call_rc(|rc| {
                (self.bft().associatorNames)(
                    self.as_ptr(),
                    ctx.as_ptr(),
                    path.as_ptr(),
                    opt_ptr(&ac),
                    opt_ptr(&rc_),
                    opt_ptr(&r),
                    opt_ptr(&rr),
                    rc,
                )
            })?
        };
        self.enumeration(p)
    }

    pub fn references(
        &self,
        ctx: &ContextRef,
        path: &ObjectPathRef,
        result_class: Option<&str>,
        role: Option<&str>,
        properties: Option<&[&str]>,
    ) -> CmpiResult<EnumerationRef> {
        let (rc_, r) = (c_opt(result_class)?, c_opt(role)?);
        let props = PropertyNames::new(properties)?;
        let p = unsafe {
            call_rc(|rc| {
                (self.bft().references)(
                    self.as_ptr(),
                    ctx.as_ptr(),
                    path.as_ptr(),
                    opt_ptr(&rc_),
                    opt_ptr(&r),
                    props.as_ptr(),
                    rc,
                )
            })?
        };
        self.enumeration(p)
    }

    pub fn reference_names(
        &self,
        ctx: &ContextRef,
        path: &ObjectPathRef,
        result_class: Option<&str>,
        role: Option<&str>,
    ) -> CmpiResult<EnumerationRef> {
        let (rc_, r) = (c_opt(result_class)?, c_opt(role)?);
        let p = unsafe {
            call_rc(|rc| {
                (self.bft().referenceNames)(self.as_ptr(), ctx.as_ptr(), path.as_ptr(), opt_ptr(&rc_), opt_ptr(&r), rc)
            })?
        };
        self.enumeration(p)
    }

    /// Invoke a method; output arguments are added to `out`
    pub fn invoke_method(
        &self,
        ctx: &ContextRef,
        path: &ObjectPathRef,
        method: &str,
        input: &ArgsRef,
        out: &ArgsRef,
    ) -> CmpiResult<Data> {
        let m = c_arg(method)?;
        unsafe {
            let d = call_rc(|rc| {
                (self.bft().invokeMethod)(
                    self.as_ptr(),
                    ctx.as_ptr(),
                    path.as_ptr(),
                    m.as_ptr(),
                    input.as_ptr(),
                    out.as_ptr(),
                    rc,
                )
            })?;
            data_from_raw(&d)
        }
    }

    pub fn set_property(&self, ctx: &ContextRef, path: &ObjectPathRef, name: &str, data: &Data) -> CmpiResult<()> {
        let n = c_arg(name)?;
        let raw = data_to_raw(self, data)?;
        unsafe {
            CmpiError::check((self.bft().setProperty)(
                self.as_ptr(),
                ctx.as_ptr(),
                path.as_ptr(),
                n.as_ptr(),
                raw.as_ptr(),
                raw.ty(),
            ))
        }
    }

    pub fn get_property(&self, ctx: &ContextRef, path: &ObjectPathRef, name: &str) -> CmpiResult<Data> {
        let n = c_arg(name)?;
        unsafe {
            let d = call_rc(|rc| (self.bft().getProperty)(self.as_ptr(), ctx.as_ptr(), path.as_ptr(), n.as_ptr(), rc))?;
            data_from_raw(&d)
        }
    }

    /// 2.1 filtered enumeration
    pub fn enumerate_instances_filtered(
        &self,
        ctx: &ContextRef,
        class_path: &ObjectPathRef,
        properties: Option<&[&str]>,
        filter: Option<(&str, &str)>,
        continue_on_error: bool,
    ) -> CmpiResult<EnumerationRef> {
        let props = PropertyNames::new(properties)?;
        let (q, l) = (c_opt(filter.map(|f| f.0))?, c_opt(filter.map(|f| f.1))?);
        let p = unsafe {
            call_rc(|rc| {
                (self.bft().enumerateInstancesFiltered)(
                    self.as_ptr(),
                    ctx.as_ptr(),
                    class_path.as_ptr(),
                    props.as_ptr(),
                    opt_ptr(&q),
                    opt_ptr(&l),
                    u8::from(continue_on_error),
                    rc,
                )
            })?
        };
        self.enumeration(p)
    }

    // ------------------------------------------------------------------------
    // Object factories (encapsulation table)
    // ------------------------------------------------------------------------

    pub fn new_string(&self, s: &str) -> CmpiResult<StringRef> {
        let c = c_arg(s)?;
        unsafe {
            let p = call_rc(|rc| (self.eft().newString)(self.as_ptr(), c.as_ptr(), rc))?;
            StringRef::from_raw(p, *self)
        }
    }

    /// String from bytes in codepage `cpid`
    pub fn new_string_cp(&self, bytes: *const c_char, cpid: CMPICodepageID) -> CmpiResult<StringRef> {
        unsafe {
            let p = call_rc(|rc| (self.eft().newStringCP)(self.as_ptr(), bytes, cpid, rc))?;
            StringRef::from_raw(p, *self)
        }
    }

    pub fn new_object_path(&self, namespace: &str, class_name: &str) -> CmpiResult<ObjectPathRef> {
        let (ns, cn) = (c_arg(namespace)?, c_arg(class_name)?);
        unsafe {
            let p = call_rc(|rc| (self.eft().newObjectPath)(self.as_ptr(), ns.as_ptr(), cn.as_ptr(), rc))?;
            ObjectPathRef::from_raw(p, *self)
        }
    }

    /// Object path holding a copy of `path`
    pub fn new_object_path_from(&self, path: &ObjectPathData) -> CmpiResult<ObjectPathRef> {
        let op = self.new_object_path(&path.namespace, &path.class_name)?;
        if !path.host.is_empty() {
            op.set_hostname(&path.host)?;
        }
        for (name, data) in path.keys.iter() {
            op.add_key(name, data)?;
        }
        Ok(op)
    }

    pub fn new_instance(&self, path: &ObjectPathRef) -> CmpiResult<InstanceRef> {
        unsafe {
            let p = call_rc(|rc| (self.eft().newInstance)(self.as_ptr(), path.as_ptr(), rc))?;
            InstanceRef::from_raw(p, *self)
        }
    }

    /// Instance holding a copy of `inst`
    pub fn new_instance_from(&self, inst: &InstanceData) -> CmpiResult<InstanceRef> {
        let op = self.new_object_path_from(&inst.path)?;
        let out = self.new_instance(&op)?;
        for p in &inst.properties {
            match &p.origin {
                Some(origin) => out.set_property_with_origin(&p.name, &p.data, Some(origin))?,
                None => out.set_property(&p.name, &p.data)?,
            }
        }
        Ok(out)
    }

    pub fn new_args(&self) -> CmpiResult<ArgsRef> {
        unsafe {
            let p = call_rc(|rc| (self.eft().newArgs)(self.as_ptr(), rc))?;
            ArgsRef::from_raw(p, *self)
        }
    }

    pub fn new_args_from(&self, args: &crate::value::ArgsData) -> CmpiResult<ArgsRef> {
        let out = self.new_args()?;
        for (name, data) in args.iter() {
            out.add_arg(name, data)?;
        }
        Ok(out)
    }

    pub fn new_array(&self, size: usize, element_type: CMPIType) -> CmpiResult<ArrayRef> {
        let size = CMPICount::try_from(size).map_err(|_| CmpiError::invalid_parameter("array too large"))?;
        unsafe {
            let p = call_rc(|rc| (self.eft().newArray)(self.as_ptr(), size, element_type, rc))?;
            ArrayRef::from_raw(p, *self)
        }
    }

    pub fn new_array_from(&self, array: &ArrayData) -> CmpiResult<ArrayRef> {
        let out = self.new_array(array.len(), array.element_type)?;
        for (i, d) in array.elements.iter().enumerate() {
            if !d.is_null() {
                out.set_element_at(i, d)?;
            }
        }
        Ok(out)
    }

    /// Current time
    pub fn new_datetime(&self) -> CmpiResult<DateTimeRef> {
        unsafe {
            let p = call_rc(|rc| (self.eft().newDateTime)(self.as_ptr(), rc))?;
            DateTimeRef::from_raw(p, *self)
        }
    }

    pub fn new_datetime_from_binary(&self, micros: u64, interval: bool) -> CmpiResult<DateTimeRef> {
        unsafe {
            let p = call_rc(|rc| (self.eft().newDateTimeFromBinary)(self.as_ptr(), micros, u8::from(interval), rc))?;
            DateTimeRef::from_raw(p, *self)
        }
    }

    pub fn new_datetime_from_chars(&self, s: &str) -> CmpiResult<DateTimeRef> {
        let c = c_arg(s)?;
        unsafe {
            let p = call_rc(|rc| (self.eft().newDateTimeFromChars)(self.as_ptr(), c.as_ptr(), rc))?;
            DateTimeRef::from_raw(p, *self)
        }
    }

    /// Datetime from an owned value, keeping its UTC offset
    pub fn new_datetime_from_data(&self, dt: &CimDateTime) -> CmpiResult<DateTimeRef> {
        self.new_datetime_from_chars(&dt.to_cim_string())
    }

    /// Parse a query; the projection array is returned when the broker builds one
    pub fn new_select_exp(&self, query: &str, language: &str) -> CmpiResult<(SelectExpRef, Option<ArrayRef>)> {
        let (q, l) = (c_arg(query)?, c_arg(language)?);
        let mut projection: *mut CMPIArray = ptr::null_mut();
        unsafe {
            let p = call_rc(|rc| (self.eft().newSelectExp)(self.as_ptr(), q.as_ptr(), l.as_ptr(), &mut projection, rc))?;
            let exp = SelectExpRef::from_raw(p, *self)?;
            let projection = if projection.is_null() {
                None
            } else {
                Some(ArrayRef::from_raw(projection, *self)?)
            };
            Ok((exp, projection))
        }
    }

    pub fn class_path_is_a(&self, path: &ObjectPathRef, class_name: &str) -> CmpiResult<bool> {
        let c = c_arg(class_name)?;
        unsafe {
            let b = call_rc(|rc| (self.eft().classPathIsA)(self.as_ptr(), path.as_ptr(), c.as_ptr(), rc))?;
            Ok(b != 0)
        }
    }

    /// Diagnostic rendering of any encapsulated object
    ///
    /// # Safety
    /// `object` must be a live encapsulated handle.
    pub unsafe fn object_to_string(&self, object: *const c_void) -> CmpiResult<String> {
        let s = call_rc(|rc| (self.eft().toString)(self.as_ptr(), object, rc))?;
        StringRef::from_raw(s, *self)?.to_str()
    }

    /// # Safety
    /// `object` must be a live encapsulated handle.
    pub unsafe fn is_of_type(&self, object: *const c_void, type_name: &str) -> CmpiResult<bool> {
        let t = c_arg(type_name)?;
        let b = call_rc(|rc| (self.eft().isOfType)(self.as_ptr(), object, t.as_ptr(), rc))?;
        Ok(b != 0)
    }

    /// # Safety
    /// `object` must be a live encapsulated handle.
    pub unsafe fn get_type(&self, object: *const c_void) -> CmpiResult<String> {
        let s = call_rc(|rc| (self.eft().getType)(self.as_ptr(), object, rc))?;
        StringRef::from_raw(s, *self)?.to_str()
    }

    /// Message lookup without insert values
    pub fn get_message(&self, msg_id: &str, default: &str) -> CmpiResult<String> {
        let (id, def) = (c_arg(msg_id)?, c_arg(default)?);
        unsafe {
            let s = call_rc(|rc| (self.eft().getMessage)(self.as_ptr(), id.as_ptr(), def.as_ptr(), rc, 0))?;
            StringRef::from_raw(s, *self)?.to_str()
        }
    }

    pub fn log_message(&self, severity: CMPISeverity, id: Option<&str>, text: &str) -> CmpiResult<()> {
        let (id, text) = (c_opt(id)?, c_arg(text)?);
        unsafe {
            CmpiError::check((self.eft().logMessage)(
                self.as_ptr(),
                severity,
                opt_ptr(&id),
                text.as_ptr(),
                ptr::null(),
            ))
        }
    }

    pub fn trace(&self, level: CMPILevel, component: &str, text: &str) -> CmpiResult<()> {
        let (c, t) = (c_arg(component)?, c_arg(text)?);
        unsafe {
            CmpiError::check((self.eft().trace)(self.as_ptr(), level, c.as_ptr(), t.as_ptr(), ptr::null()))
        }
    }

    pub fn new_error(&self, error: &ErrorData) -> CmpiResult<ErrorRef> {
        let owner = c_arg(error.owning_entity.as_deref().unwrap_or_default())?;
        let id = c_arg(error.message_id.as_deref().unwrap_or_default())?;
        let msg = c_arg(error.message.as_deref().unwrap_or_default())?;
        let er = unsafe {
            let p = call_rc(|rc| {
                (self.eft().newCMPIError)(
                    self.as_ptr(),
                    owner.as_ptr(),
                    id.as_ptr(),
                    msg.as_ptr(),
                    error.perceived_severity,
                    error.probable_cause,
                    error.cim_status_code,
                    rc,
                )
            })?;
            ErrorRef::from_raw(p, *self)?
        };
        er.set_error_type(error.error_type)?;
        if let Some(s) = &error.other_error_type {
            er.set_other_error_type(s)?;
        }
        if let Some(s) = &error.probable_cause_description {
            er.set_probable_cause_description(s)?;
        }
        if let Some(v) = &error.recommended_actions {
            er.set_recommended_actions(v)?;
        }
        if let Some(s) = &error.error_source {
            er.set_error_source(s)?;
        }
        er.set_error_source_format(error.error_source_format)?;
        if let Some(s) = &error.other_error_source_format {
            er.set_other_error_source_format(s)?;
        }
        if let Some(s) = &error.cim_status_code_description {
            er.set_cim_status_code_description(s)?;
        }
        if let Some(v) = &error.message_arguments {
            er.set_message_arguments(v)?;
        }
        Ok(er)
    }

    pub fn new_property_list(&self, names: &[&str]) -> CmpiResult<PropertyListRef> {
        let names = PropertyNames::new(Some(names))?;
        unsafe {
            let p = call_rc(|rc| (self.eft().newPropertyList)(self.as_ptr(), names.as_ptr(), rc))?;
            PropertyListRef::from_raw(p, *self)
        }
    }

    /// String array built from owned strings
    pub(crate) fn new_string_array(&self, values: &[String]) -> CmpiResult<ArrayRef> {
        let array = ArrayData::from_values(CMPI_string, values.iter().map(|s| Value::String(s.clone())));
        self.new_array_from(&array)
    }

    // ------------------------------------------------------------------------
    // OS encapsulation
    // ------------------------------------------------------------------------

    /// Resolve a module name to a platform file name (caller frees with `free_chars`)
    pub fn resolve_file_name(&self, name: &str) -> CmpiResult<String> {
        let c = c_arg(name)?;
        let xft = self.xft()?;
        unsafe {
            let p = (xft.resolveFileName)(c.as_ptr());
            if p.is_null() {
                return Err(CmpiError::failed(format!("cannot resolve {name}")));
            }
            let out = CStr::from_ptr(p).to_string_lossy().into_owned();
            self.free_chars(p);
            Ok(out)
        }
    }

    pub fn thread_sleep(&self, msec: u32) -> CmpiResult<()> {
        let xft = self.xft()?;
        let rc = unsafe { (xft.threadSleep)(msec) };
        match rc {
            0 => Ok(()),
            rc => Err(CmpiError::from_rc(CMPI_RC_ERROR_SYSTEM).message(format!("threadSleep: {rc}"))),
        }
    }

    // ------------------------------------------------------------------------
    // Memory
    // ------------------------------------------------------------------------

    /// Open a nested arena; objects created until the matching release are freed by it
    pub fn mark(&self) -> CmpiResult<GcMark> {
        let mft = self.mft()?;
        unsafe { call_rc(|rc| (mft.mark)(self.as_ptr(), rc)).map(GcMark) }
    }

    pub fn release_mark(&self, mark: GcMark) -> CmpiResult<()> {
        let mft = self.mft()?;
        unsafe { CmpiError::check((mft.release)(self.as_ptr(), mark.0)) }
    }

    /// # Safety
    /// `p` must come from this broker's allocation functions.
    pub unsafe fn free_chars(&self, p: *mut c_char) {
        match self.mft() {
            Ok(mft) => (mft.freeChars)(self.as_ptr(), p),
            Err(_) => libc::free(p.cast()),
        }
    }
}
